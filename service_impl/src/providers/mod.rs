//! Adapters for the external providers.

use reqwest::{Response, StatusCode};
use service::{integration::Provider, ServiceError};
use time::{macros::format_description, Date};

pub mod erfasst123;
pub mod timebutler;

pub use erfasst123::Erfasst123Client;
pub use timebutler::TimebutlerClient;

pub(crate) fn transport_error(provider: Provider, err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(format!("{}: {}", provider, err).into())
}

/// Rejected credentials become an auth error, every other failure status a
/// transport error.
pub(crate) fn check_status(
    provider: Provider,
    response: Response,
) -> Result<Response, ServiceError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ServiceError::IntegrationAuth(provider.code().into()))
        }
        status if status.is_success() => Ok(response),
        status => Err(ServiceError::Transport(
            format!("{} answered with {}", provider, status).into(),
        )),
    }
}

/// `YYYY-MM-DD`, `DD.MM.YYYY` or the date part of an RFC 3339 timestamp.
pub(crate) fn parse_flexible_date(value: &str) -> Option<Date> {
    let value = value.trim();
    let iso = value.get(..10).unwrap_or(value);
    Date::parse(iso, format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(value, format_description!("[day].[month].[year]")))
        .ok()
}
