use crate::gen_service_impl;
use async_trait::async_trait;
use dao::TransactionDao;
use service::{
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    employee::EmployeeService,
    overtime::{
        EmployeeSummary, OvertimeService, OvertimeSnapshot, OvertimeStatistics, OvertimeStatus,
        PeriodOvertime, RecomputeOutcome, RecomputeReport,
    },
    overtime_adjustment::OvertimeAdjustmentService,
    permission::{Authentication, HR_PRIVILEGE},
    time_entry::{TimeEntryFilter, TimeEntryService},
    week_bucket::{bucketize, Contract, WeeklyBucket},
    PermissionService, ServiceError,
};
use time::Date;
use tokio::join;
use tracing::{error, info, instrument};
use uuid::Uuid;

gen_service_impl! {
    struct OvertimeServiceImpl: OvertimeService = OvertimeServiceDeps {
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        TimeEntryService: TimeEntryService<Context = Self::Context, Transaction = Self::Transaction> = time_entry_service,
        OvertimeAdjustmentService: OvertimeAdjustmentService<Context = Self::Context, Transaction = Self::Transaction> = overtime_adjustment_service,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

fn total_overtime(buckets: &[WeeklyBucket]) -> f64 {
    buckets.iter().map(|bucket| bucket.overtime_hours).sum()
}

impl<Deps: OvertimeServiceDeps> OvertimeServiceImpl<Deps> {
    async fn check_hr_or_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Deps::Context>,
        tx: Deps::Transaction,
    ) -> Result<(), ServiceError> {
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service
                .verify_user_is_employee(employee_id, context, tx.into()),
        );
        hr_permission.or(is_employee)
    }

    async fn buckets_of(
        &self,
        employee_id: Uuid,
        filter: &TimeEntryFilter,
        tx: Deps::Transaction,
    ) -> Result<Vec<WeeklyBucket>, ServiceError> {
        let employee = self
            .employee_service
            .get(employee_id, Authentication::Full, tx.clone().into())
            .await?;
        let entries = self
            .time_entry_service
            .list_by_employee(employee_id, filter, Authentication::Full, tx.into())
            .await?;
        Ok(bucketize(&entries, &Contract::from(&employee)))
    }
}

#[async_trait]
impl<Deps: OvertimeServiceDeps> OvertimeService for OvertimeServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    #[instrument(skip(self, context, tx))]
    async fn recompute(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeSnapshot, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.check_hr_or_employee(employee_id, context, tx.clone())
            .await?;

        let weekly_buckets = self
            .buckets_of(employee_id, &TimeEntryFilter::default(), tx.clone())
            .await?;
        let adjustments_total = self
            .overtime_adjustment_service
            .total_approved_hours(employee_id, Authentication::Full, tx.clone().into())
            .await?;
        let base_balance = total_overtime(&weekly_buckets);
        let final_balance = base_balance + adjustments_total;
        let computed_at = self.clock_service.date_time_now();
        self.employee_service
            .update_overtime_cache(
                employee_id,
                final_balance,
                computed_at,
                Authentication::Full,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;

        Ok(OvertimeSnapshot {
            employee_id,
            weekly_buckets: weekly_buckets.into(),
            base_balance,
            adjustments_total,
            final_balance,
            status: OvertimeStatus::from_balance(final_balance),
            computed_at,
        })
    }

    async fn recompute_all(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<RecomputeReport, ServiceError> {
        self.permission_service
            .check_permission(HR_PRIVILEGE, context.clone())
            .await?;
        let employees = self
            .employee_service
            .get_all(Authentication::Full, None)
            .await?;

        let mut outcomes = Vec::with_capacity(employees.len());
        for employee in employees.iter() {
            let outcome = match self
                .recompute(employee.id, Authentication::Full, None)
                .await
            {
                Ok(snapshot) => RecomputeOutcome::Recomputed(snapshot.final_balance),
                Err(err) => {
                    error!(
                        "Overtime of {} ({}) could not be recomputed: {}",
                        employee.full_name(),
                        employee.id,
                        err
                    );
                    RecomputeOutcome::Failed(err.to_string().into())
                }
            };
            outcomes.push((employee.id, outcome));
        }
        let report = RecomputeReport {
            outcomes: outcomes.into(),
        };
        info!(
            "Recomputed overtime of {} employees, {} failed",
            report.succeeded(),
            report.failed()
        );
        self.activity_service
            .log(
                ActivityType::OvertimeRecomputed,
                None,
                &format!(
                    "Überstunden für {} Mitarbeiter neu berechnet, {} fehlgeschlagen",
                    report.succeeded(),
                    report.failed()
                ),
                context,
                None,
            )
            .await?;
        Ok(report)
    }

    async fn overtime_for_period(
        &self,
        employee_id: Uuid,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<PeriodOvertime, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.check_hr_or_employee(employee_id, context, tx.clone())
            .await?;
        let filter = TimeEntryFilter {
            from: Some(from),
            to: Some(to),
            source: None,
        };
        let weekly_buckets = self.buckets_of(employee_id, &filter, tx.clone()).await?;
        self.transaction_dao.commit(tx).await?;

        Ok(PeriodOvertime {
            employee_id,
            from,
            to,
            planned_hours: weekly_buckets.iter().map(|bucket| bucket.planned_hours).sum(),
            actual_hours: weekly_buckets.iter().map(|bucket| bucket.actual_hours).sum(),
            overtime_hours: total_overtime(&weekly_buckets),
            weekly_buckets: weekly_buckets.into(),
        })
    }

    async fn employee_summary(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<EmployeeSummary, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.check_hr_or_employee(employee_id, context, tx.clone())
            .await?;
        let employee = self
            .employee_service
            .get(employee_id, Authentication::Full, tx.clone().into())
            .await?;
        let weekly_buckets = self
            .buckets_of(employee_id, &TimeEntryFilter::default(), tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;

        let total_worked_hours: f64 = weekly_buckets.iter().map(|bucket| bucket.actual_hours).sum();
        let weeks = weekly_buckets.len() as u32;
        Ok(EmployeeSummary {
            employee_id,
            total_worked_hours,
            total_planned_hours: weekly_buckets.iter().map(|bucket| bucket.planned_hours).sum(),
            average_weekly_hours: if weeks > 0 {
                total_worked_hours / weeks as f64
            } else {
                0.0
            },
            weeks,
            overtime_balance: employee.overtime_balance,
            status: OvertimeStatus::from_balance(employee.overtime_balance),
            last_computed_at: employee.last_computed_at,
        })
    }

    async fn statistics(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeStatistics, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let employees = self
            .employee_service
            .get_active(Authentication::Full, tx.clone().into())
            .await?;
        self.transaction_dao.commit(tx).await?;

        let mut statistics = OvertimeStatistics {
            total_employees: employees.len() as u32,
            total_balance: 0.0,
            average_balance: 0.0,
            positive: 0,
            negative: 0,
            neutral: 0,
        };
        for employee in employees.iter() {
            statistics.total_balance += employee.overtime_balance;
            match OvertimeStatus::from_balance(employee.overtime_balance) {
                OvertimeStatus::Positive => statistics.positive += 1,
                OvertimeStatus::Negative => statistics.negative += 1,
                OvertimeStatus::Neutral => statistics.neutral += 1,
            }
        }
        if statistics.total_employees > 0 {
            statistics.average_balance =
                statistics.total_balance / statistics.total_employees as f64;
        }
        Ok(statistics)
    }
}
