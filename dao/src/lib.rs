use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub mod absence;
pub mod activity;
pub mod employee;
pub mod integration;
pub mod overtime_adjustment;
pub mod permission;
pub mod project_assignment;
pub mod time_entry;

pub use permission::{MockPermissionDao, PermissionDao, UserEntity};

#[derive(Error, Debug)]
pub enum DaoError {
    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Enum value not found: {0}")]
    EnumValueNotFound(Arc<str>),

    #[error("Uuid error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("Could not parse date or time: {0}")]
    DateTimeParseError(#[from] time::error::Parse),

    #[error("Could not format date or time: {0}")]
    DateTimeFormatError(#[from] time::error::Format),

    #[error("Invalid date component: {0}")]
    DateComponentError(#[from] time::error::ComponentRange),
}

/// Origin of a record which may be imported from an external provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSourceEntity {
    Manual,
    Timebutler,
    Erfasst123,
}

impl DataSourceEntity {
    pub fn code(&self) -> &'static str {
        match self {
            DataSourceEntity::Manual => "manual",
            DataSourceEntity::Timebutler => "timebutler",
            DataSourceEntity::Erfasst123 => "123erfasst",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, DaoError> {
        match code {
            "manual" => Ok(DataSourceEntity::Manual),
            "timebutler" => Ok(DataSourceEntity::Timebutler),
            "123erfasst" => Ok(DataSourceEntity::Erfasst123),
            _ => Err(DaoError::EnumValueNotFound(code.into())),
        }
    }
}

pub trait Transaction: Clone + Debug + Send + Sync + 'static {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockTransaction;
impl Transaction for MockTransaction {}

#[automock(type Transaction = MockTransaction;)]
#[async_trait]
pub trait TransactionDao {
    type Transaction: Transaction;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError>;

    /// Reuses the given transaction or opens a new one.
    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError>;

    /// Commits only if the given handle is the last reference to the transaction.
    async fn commit(&self, transaction: Self::Transaction) -> Result<(), DaoError>;
}
