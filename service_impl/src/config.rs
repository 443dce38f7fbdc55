use std::{env, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use peopleflow_utils::Region;
use service::{
    config::{Config, ConfigService},
    ServiceError, ValidationFailureItem,
};
use time::{format_description::well_known::Iso8601, Date};
use tracing::warn;

/// Reads the configuration from the environment. Unset variables get their
/// defaults, malformed ones are rejected.
pub struct ConfigServiceImpl;

fn invalid(variable: &str) -> ServiceError {
    ServiceError::ValidationError(Arc::new([ValidationFailureItem::InvalidValue(
        variable.into(),
    )]))
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &str,
    default: T,
) -> Result<T, ServiceError> {
    match lookup(variable) {
        Some(value) => value.trim().parse().map_err(|_| invalid(variable)),
        None => Ok(default),
    }
}

fn string_var(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &str,
    default: &Arc<str>,
) -> Arc<str> {
    lookup(variable)
        .map(Arc::from)
        .unwrap_or_else(|| default.clone())
}

/// Builds the configuration from a variable lookup.
pub fn config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ServiceError> {
    let defaults = Config::default();

    let default_region = match lookup("DEFAULT_REGION") {
        Some(code) => Region::from_code(code.trim()).unwrap_or_else(|| {
            warn!("Unknown DEFAULT_REGION {code}, using {}", defaults.default_region.code());
            defaults.default_region
        }),
        None => defaults.default_region,
    };
    let import_cutoff_date = match lookup("IMPORT_CUTOFF_DATE") {
        Some(value) if !value.trim().is_empty() => Some(
            Date::parse(value.trim(), &Iso8601::DATE)
                .map_err(|_| invalid("IMPORT_CUTOFF_DATE"))?,
        ),
        _ => None,
    };
    let encryption_key = lookup("PEOPLEFLOW_ENCRYPTION_KEY")
        .filter(|key| !key.is_empty())
        .map(Arc::from);

    Ok(Config {
        database_url: string_var(&lookup, "DATABASE_URL", &defaults.database_url),
        sync_interval: Duration::from_secs(parse_var(
            &lookup,
            "SYNC_INTERVAL_SECONDS",
            defaults.sync_interval.as_secs(),
        )?),
        cleanup_cron: string_var(&lookup, "CLEANUP_CRON", &defaults.cleanup_cron),
        default_region,
        default_weekly_hours: parse_var(
            &lookup,
            "DEFAULT_WEEKLY_HOURS",
            defaults.default_weekly_hours,
        )?,
        default_vacation_days: parse_var(
            &lookup,
            "DEFAULT_VACATION_DAYS",
            defaults.default_vacation_days,
        )?,
        import_cutoff_date,
        encryption_key,
        http_timeout: Duration::from_secs(parse_var(
            &lookup,
            "HTTP_TIMEOUT_SECONDS",
            defaults.http_timeout.as_secs(),
        )?),
        timebutler_base_url: string_var(
            &lookup,
            "TIMEBUTLER_BASE_URL",
            &defaults.timebutler_base_url,
        ),
        erfasst123_base_url: string_var(
            &lookup,
            "ERFASST123_BASE_URL",
            &defaults.erfasst123_base_url,
        ),
        timezone: string_var(&lookup, "TIMEZONE", &defaults.timezone),
    })
}

#[async_trait]
impl ConfigService for ConfigServiceImpl {
    async fn get_config(&self) -> Result<Config, ServiceError> {
        config_from(|variable| env::var(variable).ok())
    }
}

/// Fixed configuration, used by tests and embedders which do not read the
/// environment.
pub struct StaticConfigService(pub Config);

#[async_trait]
impl ConfigService for StaticConfigService {
    async fn get_config(&self) -> Result<Config, ServiceError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use time::macros::date;

    fn lookup<'a>(
        vars: &'a HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |variable| vars.get(variable).map(|value| value.to_string())
    }

    #[test]
    fn test_unset_variables_use_defaults() {
        let config = config_from(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_url.as_ref(), "sqlite:./localdb.sqlite3");
    }

    #[test]
    fn test_variables_override_defaults() {
        let vars = HashMap::from([
            ("DATABASE_URL", "sqlite:/var/lib/peopleflow/db.sqlite3"),
            ("SYNC_INTERVAL_SECONDS", "60"),
            ("DEFAULT_REGION", "SN"),
            ("IMPORT_CUTOFF_DATE", "2024-01-01"),
            ("PEOPLEFLOW_ENCRYPTION_KEY", ""),
        ]);
        let config = config_from(lookup(&vars)).unwrap();
        assert_eq!(
            config.database_url.as_ref(),
            "sqlite:/var/lib/peopleflow/db.sqlite3"
        );
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert_eq!(config.default_region, Region::Sachsen);
        assert_eq!(config.import_cutoff_date, Some(date!(2024 - 01 - 01)));
        assert_eq!(config.encryption_key, None);
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let vars = HashMap::from([("HTTP_TIMEOUT_SECONDS", "ten")]);
        let result = config_from(lookup(&vars));
        assert!(matches!(
            result,
            Err(ServiceError::ValidationError(failures))
                if failures[0] == ValidationFailureItem::InvalidValue("HTTP_TIMEOUT_SECONDS".into())
        ));
    }
}
