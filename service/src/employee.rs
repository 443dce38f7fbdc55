use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::employee::{EmployeeEntity, EmployeeStatusEntity, WorkTimeModelEntity};
use mockall::automock;
use peopleflow_utils::Region;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::config::Config;
use crate::integration::Provider;
use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkTimeModel {
    FullTime,
    PartTime,
    Flex,
    Remote,
    Shift,
    Contract,
    Intern,
}

impl WorkTimeModel {
    pub fn label(&self) -> &'static str {
        match self {
            WorkTimeModel::FullTime => "Vollzeit",
            WorkTimeModel::PartTime => "Teilzeit",
            WorkTimeModel::Flex => "Gleitzeit",
            WorkTimeModel::Remote => "Remote",
            WorkTimeModel::Shift => "Schichtarbeit",
            WorkTimeModel::Contract => "Werkvertrag",
            WorkTimeModel::Intern => "Praktikum",
        }
    }
}

impl From<&WorkTimeModelEntity> for WorkTimeModel {
    fn from(model: &WorkTimeModelEntity) -> Self {
        match model {
            WorkTimeModelEntity::FullTime => Self::FullTime,
            WorkTimeModelEntity::PartTime => Self::PartTime,
            WorkTimeModelEntity::Flex => Self::Flex,
            WorkTimeModelEntity::Remote => Self::Remote,
            WorkTimeModelEntity::Shift => Self::Shift,
            WorkTimeModelEntity::Contract => Self::Contract,
            WorkTimeModelEntity::Intern => Self::Intern,
        }
    }
}
impl From<&WorkTimeModel> for WorkTimeModelEntity {
    fn from(model: &WorkTimeModel) -> Self {
        match model {
            WorkTimeModel::FullTime => Self::FullTime,
            WorkTimeModel::PartTime => Self::PartTime,
            WorkTimeModel::Flex => Self::Flex,
            WorkTimeModel::Remote => Self::Remote,
            WorkTimeModel::Shift => Self::Shift,
            WorkTimeModel::Contract => Self::Contract,
            WorkTimeModel::Intern => Self::Intern,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmployeeStatus {
    Active,
    /// Soft deleted.
    Inactive,
    OnLeave,
    Remote,
}

impl EmployeeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "Aktiv",
            EmployeeStatus::Inactive => "Inaktiv",
            EmployeeStatus::OnLeave => "Beurlaubt",
            EmployeeStatus::Remote => "Remote",
        }
    }
}

impl From<&EmployeeStatusEntity> for EmployeeStatus {
    fn from(status: &EmployeeStatusEntity) -> Self {
        match status {
            EmployeeStatusEntity::Active => Self::Active,
            EmployeeStatusEntity::Inactive => Self::Inactive,
            EmployeeStatusEntity::OnLeave => Self::OnLeave,
            EmployeeStatusEntity::Remote => Self::Remote,
        }
    }
}
impl From<&EmployeeStatus> for EmployeeStatusEntity {
    fn from(status: &EmployeeStatus) -> Self {
        match status {
            EmployeeStatus::Active => Self::Active,
            EmployeeStatus::Inactive => Self::Inactive,
            EmployeeStatus::OnLeave => Self::OnLeave,
            EmployeeStatus::Remote => Self::Remote,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: Arc<str>,
    pub last_name: Arc<str>,
    pub email: Arc<str>,
    /// Login of the employee, used for self service.
    pub user_name: Option<Arc<str>>,
    pub employee_number: Option<Arc<str>>,
    pub department: Option<Arc<str>>,

    pub weekly_hours_target: f64,
    pub working_days_per_week: u8,
    pub work_time_model: WorkTimeModel,
    pub region: Option<Arc<str>>,
    pub annual_vacation_entitlement: f64,
    pub status: EmployeeStatus,
    pub hire_date: Option<Date>,

    pub timebutler_id: Option<Arc<str>>,
    pub erfasst123_id: Option<Arc<str>>,

    pub overtime_balance: f64,
    pub last_computed_at: Option<PrimitiveDateTime>,

    pub created: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl Employee {
    /// A new, unsaved employee with the contract defaults of the configuration.
    pub fn with_defaults(
        first_name: &str,
        last_name: &str,
        email: &str,
        config: &Config,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            user_name: None,
            employee_number: None,
            department: None,
            weekly_hours_target: config.default_weekly_hours,
            working_days_per_week: 5,
            work_time_model: WorkTimeModel::FullTime,
            region: None,
            annual_vacation_entitlement: config.default_vacation_days,
            status: EmployeeStatus::Active,
            hire_date: None,
            timebutler_id: None,
            erfasst123_id: None,
            overtime_balance: 0.0,
            last_computed_at: None,
            created: None,
            version: Uuid::nil(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn working_hours_per_day(&self) -> f64 {
        if self.working_days_per_week > 0 {
            self.weekly_hours_target / self.working_days_per_week as f64
        } else {
            0.0
        }
    }

    /// The holiday region of the employee, falling back to the given default
    /// if none or an unknown code is stored.
    pub fn region_or(&self, fallback: Region) -> Region {
        match self.region.as_deref() {
            Some(code) => Region::from_code_or(code, fallback),
            None => fallback,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != EmployeeStatus::Inactive
    }
}

impl From<&EmployeeEntity> for Employee {
    fn from(employee: &EmployeeEntity) -> Self {
        Self {
            id: employee.id,
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            user_name: employee.user_name.clone(),
            employee_number: employee.employee_number.clone(),
            department: employee.department.clone(),
            weekly_hours_target: employee.weekly_hours_target,
            working_days_per_week: employee.working_days_per_week,
            work_time_model: (&employee.work_time_model).into(),
            region: employee.region.clone(),
            annual_vacation_entitlement: employee.annual_vacation_entitlement,
            status: (&employee.status).into(),
            hire_date: employee.hire_date,
            timebutler_id: employee.timebutler_id.clone(),
            erfasst123_id: employee.erfasst123_id.clone(),
            overtime_balance: employee.overtime_balance,
            last_computed_at: employee.last_computed_at,
            created: Some(employee.created),
            version: employee.version,
        }
    }
}
impl TryFrom<&Employee> for EmployeeEntity {
    type Error = ServiceError;
    fn try_from(employee: &Employee) -> Result<Self, Self::Error> {
        Ok(Self {
            id: employee.id,
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            user_name: employee.user_name.clone(),
            employee_number: employee.employee_number.clone(),
            department: employee.department.clone(),
            weekly_hours_target: employee.weekly_hours_target,
            working_days_per_week: employee.working_days_per_week,
            work_time_model: (&employee.work_time_model).into(),
            region: employee.region.clone(),
            annual_vacation_entitlement: employee.annual_vacation_entitlement,
            status: (&employee.status).into(),
            hire_date: employee.hire_date,
            timebutler_id: employee.timebutler_id.clone(),
            erfasst123_id: employee.erfasst123_id.clone(),
            overtime_balance: employee.overtime_balance,
            last_computed_at: employee.last_computed_at,
            created: employee.created.ok_or(ServiceError::InternalError)?,
            version: employee.version,
        })
    }
}

peopleflow_utils::derive_from_reference!(EmployeeEntity, Employee);
peopleflow_utils::derive_try_from_reference!(Employee, EmployeeEntity, ServiceError);

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait EmployeeService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Employee]>, ServiceError>;

    /// All employees which are not inactive.
    async fn get_active(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Employee]>, ServiceError>;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError>;

    /// Case insensitive lookup by email.
    async fn find_by_email(
        &self,
        email: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Employee>, ServiceError>;

    /// The employee record of the calling user, if there is one.
    async fn current_employee(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Employee>, ServiceError>;

    async fn create(
        &self,
        employee: &Employee,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError>;

    /// Updates master and contract data. The cached overtime balance is
    /// left untouched.
    async fn update(
        &self,
        employee: &Employee,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError>;

    /// Stores the identity of the employee at a provider. The hire date is
    /// only written if the employee has none yet.
    async fn link_provider_identity(
        &self,
        id: Uuid,
        provider: Provider,
        foreign_id: &str,
        hire_date: Option<Date>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError>;

    async fn update_overtime_cache(
        &self,
        id: Uuid,
        overtime_balance: f64,
        computed_at: PrimitiveDateTime,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;

    /// Succeeds if the calling user is the given employee.
    async fn verify_user_is_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;
}
