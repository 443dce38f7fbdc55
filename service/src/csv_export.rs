use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::Date;

use crate::permission::Authentication;
use crate::ServiceError;

pub const TIME_TRACKING_HEADER: [&str; 7] = [
    "Employee", "Date", "Start", "End", "Duration", "Project", "Activity",
];

pub const OVERTIME_HEADER: [&str; 7] = [
    "Employee",
    "Department",
    "WeeklyTarget",
    "RecordedHours",
    "OvertimeBalance",
    "Status",
    "LastComputed",
];

/// Shown instead of a timestamp for employees without a computed balance.
pub const NOT_YET_COMPUTED: &str = "Noch nicht berechnet";

/// Produces the CSV documents of the accounting core. UTF-8, comma
/// separated, `\n` line ends.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait CsvExportService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Time entries of all employees in the inclusive range, ordered by
    /// employee name, date and start.
    async fn export_time_tracking(
        &self,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError>;

    /// One line per active employee with the cached overtime balance.
    async fn export_overtime(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError>;
}
