use std::sync::Arc;
use std::time::Duration;

use crate::ServiceError;
use async_trait::async_trait;
use mockall::automock;
use peopleflow_utils::Region;
use time::Date;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub database_url: Arc<str>,
    pub sync_interval: Duration,
    pub cleanup_cron: Arc<str>,
    pub default_region: Region,
    pub default_weekly_hours: f64,
    pub default_vacation_days: f64,
    /// Nothing before this date is imported, regardless of the integration.
    pub import_cutoff_date: Option<Date>,
    pub encryption_key: Option<Arc<str>>,
    pub http_timeout: Duration,
    pub timebutler_base_url: Arc<str>,
    pub erfasst123_base_url: Arc<str>,
    pub timezone: Arc<str>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./localdb.sqlite3".into(),
            sync_interval: Duration::from_secs(300),
            cleanup_cron: "0 0 3 * * *".into(),
            default_region: Region::default(),
            default_weekly_hours: 40.0,
            default_vacation_days: 30.0,
            import_cutoff_date: None,
            encryption_key: None,
            http_timeout: Duration::from_secs(10),
            timebutler_base_url: "https://app.timebutler.com".into(),
            erfasst123_base_url: "https://server.123erfasst.de".into(),
            timezone: "Europe/Berlin".into(),
        }
    }
}

#[automock]
#[async_trait]
pub trait ConfigService {
    async fn get_config(&self) -> Result<Config, ServiceError>;
}
