use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::week_bucket::WeeklyBucket;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OvertimeStatus {
    Positive,
    Negative,
    Neutral,
}

impl OvertimeStatus {
    pub fn from_balance(balance: f64) -> Self {
        if balance > 0.0 {
            OvertimeStatus::Positive
        } else if balance < 0.0 {
            OvertimeStatus::Negative
        } else {
            OvertimeStatus::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OvertimeStatus::Positive => "Positiv",
            OvertimeStatus::Negative => "Negativ",
            OvertimeStatus::Neutral => "Ausgeglichen",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OvertimeSnapshot {
    pub employee_id: Uuid,
    pub weekly_buckets: Arc<[WeeklyBucket]>,
    /// Sum of the weekly overtime.
    pub base_balance: f64,
    /// Sum of the approved adjustments.
    pub adjustments_total: f64,
    pub final_balance: f64,
    pub status: OvertimeStatus,
    pub computed_at: PrimitiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecomputeOutcome {
    Recomputed(f64),
    Failed(Arc<str>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecomputeReport {
    pub outcomes: Arc<[(Uuid, RecomputeOutcome)]>,
}

impl RecomputeReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RecomputeOutcome::Failed(_)))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }
}

/// Bucket sums for a date range, nothing is written back.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodOvertime {
    pub employee_id: Uuid,
    pub from: Date,
    pub to: Date,
    pub weekly_buckets: Arc<[WeeklyBucket]>,
    pub planned_hours: f64,
    pub actual_hours: f64,
    pub overtime_hours: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeSummary {
    pub employee_id: Uuid,
    pub total_worked_hours: f64,
    pub total_planned_hours: f64,
    /// Over the weeks in which the employee worked at all.
    pub average_weekly_hours: f64,
    pub weeks: u32,
    pub overtime_balance: f64,
    pub status: OvertimeStatus,
    pub last_computed_at: Option<PrimitiveDateTime>,
}

/// Aggregated over the cached balances of the active employees.
#[derive(Clone, Debug, PartialEq)]
pub struct OvertimeStatistics {
    pub total_employees: u32,
    pub total_balance: f64,
    pub average_balance: f64,
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait OvertimeService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Computes the balance from scratch and caches it on the employee.
    async fn recompute(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeSnapshot, ServiceError>;

    /// Recomputes every active employee. A failing employee is reported
    /// and does not stop the run.
    async fn recompute_all(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<RecomputeReport, ServiceError>;

    async fn overtime_for_period(
        &self,
        employee_id: Uuid,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<PeriodOvertime, ServiceError>;

    async fn employee_summary(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<EmployeeSummary, ServiceError>;

    async fn statistics(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeStatistics, ServiceError>;
}
