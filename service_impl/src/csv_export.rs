use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::TransactionDao;
use peopleflow_utils::hours::format_signed;
use service::{
    csv_export::{CsvExportService, NOT_YET_COMPUTED, OVERTIME_HEADER, TIME_TRACKING_HEADER},
    employee::{Employee, EmployeeService},
    overtime::OvertimeStatus,
    permission::{Authentication, HR_PRIVILEGE},
    time_entry::{TimeEntry, TimeEntryFilter, TimeEntryService},
    PermissionService, ServiceError,
};
use time::{macros::format_description, Date};
use tracing::error;
use uuid::Uuid;

gen_service_impl! {
    struct CsvExportServiceImpl: CsvExportService = CsvExportServiceDeps {
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        TimeEntryService: TimeEntryService<Context = Self::Context, Transaction = Self::Transaction> = time_entry_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

fn export_error(err: impl Display) -> ServiceError {
    error!("CSV export failed: {}", err);
    ServiceError::InternalError
}

/// Writes the header and rows as UTF-8 with `\n` line ends.
fn write_csv<const N: usize>(
    header: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<Arc<str>, ServiceError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    writer.write_record(header).map_err(export_error)?;
    for row in rows {
        writer.write_record(row).map_err(export_error)?;
    }
    let bytes = writer.into_inner().map_err(export_error)?;
    Ok(String::from_utf8(bytes).map_err(export_error)?.into())
}

pub(crate) fn time_tracking_row(
    employee_name: &str,
    entry: &TimeEntry,
) -> Result<[String; 7], ServiceError> {
    let project = if entry.project_name.is_empty() {
        entry.project_ref.to_string()
    } else {
        entry.project_name.to_string()
    };
    Ok([
        employee_name.to_string(),
        entry
            .date
            .format(format_description!("[day].[month].[year]"))
            .map_err(export_error)?,
        entry
            .start
            .format(format_description!("[hour]:[minute]"))
            .map_err(export_error)?,
        entry
            .end
            .format(format_description!("[hour]:[minute]"))
            .map_err(export_error)?,
        format!("{:.2}", entry.duration_hours),
        project,
        entry.activity_ref.to_string(),
    ])
}

pub(crate) fn overtime_row(
    employee: &Employee,
    recorded_hours: f64,
) -> Result<[String; 7], ServiceError> {
    let last_computed = match employee.last_computed_at {
        Some(computed_at) => computed_at
            .format(format_description!("[day].[month].[year] [hour]:[minute]"))
            .map_err(export_error)?,
        None => NOT_YET_COMPUTED.to_string(),
    };
    Ok([
        employee.full_name(),
        employee.department.as_deref().unwrap_or_default().to_string(),
        format!("{:.1}", employee.weekly_hours_target),
        format!("{:.1}", recorded_hours),
        format_signed(employee.overtime_balance, 2),
        OvertimeStatus::from_balance(employee.overtime_balance)
            .label()
            .to_string(),
        last_computed,
    ])
}

#[async_trait]
impl<Deps: CsvExportServiceDeps> CsvExportService for CsvExportServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn export_time_tracking(
        &self,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let names: HashMap<Uuid, String> = self
            .employee_service
            .get_all(Authentication::Full, tx.clone().into())
            .await?
            .iter()
            .map(|employee| (employee.id, employee.full_name()))
            .collect();
        let entries = self
            .time_entry_service
            .list_by_date_range(from, to, Authentication::Full, tx.clone().into())
            .await?;
        self.transaction_dao.commit(tx).await?;

        let mut rows = entries
            .iter()
            .map(|entry| {
                let name = names
                    .get(&entry.employee_id)
                    .cloned()
                    .unwrap_or_else(|| entry.employee_id.to_string());
                (name, entry)
            })
            .collect::<Vec<_>>();
        rows.sort_by(|(a_name, a), (b_name, b)| {
            a_name
                .cmp(b_name)
                .then(a.date.cmp(&b.date))
                .then(a.start.cmp(&b.start))
        });
        let rows = rows
            .into_iter()
            .map(|(name, entry)| time_tracking_row(&name, entry))
            .collect::<Result<Vec<_>, ServiceError>>()?;
        write_csv(TIME_TRACKING_HEADER, rows)
    }

    async fn export_overtime(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let mut employees = self
            .employee_service
            .get_active(Authentication::Full, tx.clone().into())
            .await?
            .to_vec();
        employees.sort_by_key(|employee| employee.full_name());

        let mut rows = Vec::with_capacity(employees.len());
        for employee in employees.iter() {
            let recorded_hours: f64 = self
                .time_entry_service
                .list_by_employee(
                    employee.id,
                    &TimeEntryFilter::default(),
                    Authentication::Full,
                    tx.clone().into(),
                )
                .await?
                .iter()
                .map(|entry| entry.duration_hours)
                .sum();
            rows.push(overtime_row(employee, recorded_hours)?);
        }
        self.transaction_dao.commit(tx).await?;
        write_csv(OVERTIME_HEADER, rows)
    }
}
