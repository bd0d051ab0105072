use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::CompanySettings;
use crate::database::models::{Employee, EmployeeInput, PaymentProfile};
use crate::database::repositories::{EmployeeRepository, LeaveRepository, leave::current_year};
use crate::database::transaction::with_transaction;
use crate::error::AppError;

#[derive(Clone)]
pub struct EmployeeService {
    pool: PgPool,
    employees: EmployeeRepository,
    leave: LeaveRepository,
    settings: CompanySettings,
}

impl EmployeeService {
    pub fn new(
        pool: PgPool,
        employees: EmployeeRepository,
        leave: LeaveRepository,
        settings: CompanySettings,
    ) -> Self {
        Self {
            pool,
            employees,
            leave,
            settings,
        }
    }

    /// Onboard a new employee: the employee row, a zero-salary payment
    /// profile at the configured default overtime rate, and the current
    /// year's leave balance are created in one transaction.
    pub async fn onboard(&self, input: EmployeeInput) -> Result<Employee, AppError> {
        if input.fullname.trim().is_empty() {
            return Err(AppError::BadRequest("Fullname must not be empty".to_string()));
        }

        let employees = self.employees.clone();
        let leave = self.leave.clone();
        let settings = self.settings.clone();

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let employee = employees.create(tx, &input).await?;
                employees
                    .create_payment_profile(
                        tx,
                        employee.id,
                        BigDecimal::from(0),
                        settings.default_overtime_rate.clone(),
                    )
                    .await?;
                leave
                    .create_balance(
                        tx,
                        employee.id,
                        current_year(),
                        settings.default_casual_leave,
                        settings.default_sick_leave,
                    )
                    .await?;
                Ok(employee)
            })
        })
        .await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Employee>, AppError> {
        Ok(self.employees.find_by_id(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Employee>, AppError> {
        Ok(self.employees.list_all().await?)
    }

    pub async fn payment_profile(&self, employee_id: Uuid) -> Result<PaymentProfile, AppError> {
        self.employees
            .payment_profile(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment profile missing".to_string()))
    }
}
