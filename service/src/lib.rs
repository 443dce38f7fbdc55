use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

pub mod absence;
pub mod activity;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod csv_export;
pub mod employee;
pub mod import;
pub mod integration;
pub mod overtime;
pub mod overtime_adjustment;
pub mod permission;
pub mod project_assignment;
pub mod provider;
pub mod scheduler;
pub mod time_entry;
pub mod user_service;
pub mod uuid_service;
pub mod week_bucket;

pub use permission::MockPermissionService;
pub use permission::PermissionService;
pub use permission::User;

/// A single failed check of a validation. Every item names the field it
/// refers to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ValidationFailureItem {
    ModificationNotAllowed(Arc<str>),
    InvalidValue(Arc<str>),
    IdDoesNotExist(Arc<str>, Uuid),
}

impl ValidationFailureItem {
    pub fn field(&self) -> &str {
        match self {
            ValidationFailureItem::ModificationNotAllowed(field) => field,
            ValidationFailureItem::InvalidValue(field) => field,
            ValidationFailureItem::IdDoesNotExist(field, _) => field,
        }
    }
}

/// Coarse classification of a [`ServiceError`] which callers can rely on.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    NotFound,
    Invalid,
    InvalidTransition,
    QuotaExceeded,
    Conflict,
    Auth,
    Transport,
    Forbidden,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Invalid => "INVALID",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Auth => "AUTH",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] dao::DaoError),

    #[error("Forbidden")]
    Forbidden,

    #[error("Entity {0} not found")]
    EntityNotFound(Uuid),

    #[error("Entity {0} conflicts, expected version {1} but got {2}")]
    EntityConflicts(Uuid, Uuid, Uuid),

    #[error("Validation error: {0:?}")]
    ValidationError(Arc<[ValidationFailureItem]>),

    #[error("ID cannot be set on create")]
    IdSetOnCreate,

    #[error("Version cannot be set on create")]
    VersionSetOnCreate,

    #[error("Transition from {from} to {to} is not allowed")]
    InvalidTransition { from: Arc<str>, to: Arc<str> },

    #[error("Vacation quota exceeded: requested {requested} days, {remaining} remaining")]
    QuotaExceeded { requested: f64, remaining: f64 },

    #[error("Integration {0} rejected the credentials")]
    IntegrationAuth(Arc<str>),

    #[error("Integration {0} is not configured")]
    IntegrationNotConfigured(Arc<str>),

    #[error("Transport error: {0}")]
    Transport(Arc<str>),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Credential encryption failed: {0}")]
    CryptoError(Arc<str>),

    #[error("Date error: {0}")]
    DateUtilsError(#[from] peopleflow_utils::DateUtilsError),

    #[error("Time component range error: {0}")]
    TimeComponentRangeError(#[from] time::error::ComponentRange),

    #[error("Internal error")]
    InternalError,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::EntityNotFound(_) | ServiceError::IntegrationNotConfigured(_) => {
                ErrorKind::NotFound
            }
            ServiceError::ValidationError(_)
            | ServiceError::IdSetOnCreate
            | ServiceError::VersionSetOnCreate => ErrorKind::Invalid,
            ServiceError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ServiceError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            ServiceError::EntityConflicts(..) => ErrorKind::Conflict,
            ServiceError::IntegrationAuth(_) => ErrorKind::Auth,
            ServiceError::Transport(_) => ErrorKind::Transport,
            ServiceError::Forbidden => ErrorKind::Forbidden,
            ServiceError::Cancelled => ErrorKind::Cancelled,
            ServiceError::DatabaseQueryError(_)
            | ServiceError::CryptoError(_)
            | ServiceError::DateUtilsError(_)
            | ServiceError::TimeComponentRangeError(_)
            | ServiceError::InternalError => ErrorKind::Internal,
        }
    }

    /// Message which can be shown to the user of the HR application.
    pub fn user_message(&self) -> Arc<str> {
        match self {
            ServiceError::EntityNotFound(_) => "Eintrag wurde nicht gefunden.".into(),
            ServiceError::IntegrationNotConfigured(provider) => {
                format!("Die Integration {provider} ist nicht eingerichtet.").into()
            }
            ServiceError::ValidationError(items) => {
                let fields = items
                    .iter()
                    .map(|item| item.field())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Ungültige Eingabe: {fields}").into()
            }
            ServiceError::IdSetOnCreate | ServiceError::VersionSetOnCreate => {
                "Ungültige Eingabe.".into()
            }
            ServiceError::InvalidTransition { from, to } => {
                format!("Statuswechsel von {from} nach {to} ist nicht möglich.").into()
            }
            ServiceError::QuotaExceeded {
                requested,
                remaining,
            } => format!(
                "Urlaubsanspruch überschritten: {requested} Tage beantragt, {remaining} Tage verfügbar."
            )
            .into(),
            ServiceError::EntityConflicts(..) => {
                "Der Eintrag wurde zwischenzeitlich geändert. Bitte neu laden.".into()
            }
            ServiceError::IntegrationAuth(provider) => format!(
                "Die Zugangsdaten für {provider} wurden abgelehnt. Die Integration wurde deaktiviert."
            )
            .into(),
            ServiceError::Transport(_) => {
                "Der externe Dienst ist derzeit nicht erreichbar.".into()
            }
            ServiceError::Forbidden => "Keine Berechtigung.".into(),
            ServiceError::Cancelled => "Der Vorgang wurde abgebrochen.".into(),
            ServiceError::DatabaseQueryError(_)
            | ServiceError::CryptoError(_)
            | ServiceError::DateUtilsError(_)
            | ServiceError::TimeComponentRangeError(_)
            | ServiceError::InternalError => "Interner Fehler.".into(),
        }
    }
}
