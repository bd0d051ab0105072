use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Employee, EmployeeInput, PaymentProfile, PaymentProfileUpdateInput},
    utils::sql,
};

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new employee inside the caller's transaction.
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &EmployeeInput,
    ) -> Result<Employee> {
        let employee = sqlx::query_as::<_, Employee>(&sql(r#"
            INSERT INTO
                employees (fullname, email, department, designation, date_of_joining)
            VALUES
                (?, ?, ?, ?, ?)
            RETURNING
                id, fullname, email, department, designation, date_of_joining,
                bank_account, ifsc_code, is_verified, pending_update, created_at
        "#))
        .bind(&input.fullname)
        .bind(&input.email)
        .bind(&input.department)
        .bind(&input.designation)
        .bind(input.date_of_joining.unwrap_or_else(|| Utc::now().date_naive()))
        .fetch_one(&mut **tx)
        .await?;

        Ok(employee)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(&sql(r#"
            SELECT
                id, fullname, email, department, designation, date_of_joining,
                bank_account, ifsc_code, is_verified, pending_update, created_at
            FROM
                employees
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn list_all(&self) -> Result<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(&sql(r#"
            SELECT
                id, fullname, email, department, designation, date_of_joining,
                bank_account, ifsc_code, is_verified, pending_update, created_at
            FROM
                employees
            ORDER BY
                fullname
        "#))
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }

    /// Insert the employee's payment profile inside the caller's transaction.
    pub async fn create_payment_profile(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        employee_id: Uuid,
        base_salary: BigDecimal,
        overtime_rate: BigDecimal,
    ) -> Result<PaymentProfile> {
        let profile = sqlx::query_as::<_, PaymentProfile>(&sql(r#"
            INSERT INTO
                payment_profiles (employee_id, base_salary, overtime_rate, updated_at)
            VALUES
                (?, ?, ?, ?)
            RETURNING
                id, employee_id, base_salary, overtime_rate, updated_at
        "#))
        .bind(employee_id)
        .bind(base_salary)
        .bind(overtime_rate)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(profile)
    }

    pub async fn payment_profile(&self, employee_id: Uuid) -> Result<Option<PaymentProfile>> {
        let profile = sqlx::query_as::<_, PaymentProfile>(&sql(r#"
            SELECT
                id, employee_id, base_salary, overtime_rate, updated_at
            FROM
                payment_profiles
            WHERE
                employee_id = ?
        "#))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn update_payment_profile(
        &self,
        employee_id: Uuid,
        update: PaymentProfileUpdateInput,
    ) -> Result<Option<PaymentProfile>> {
        let profile = sqlx::query_as::<_, PaymentProfile>(&sql(r#"
            UPDATE
                payment_profiles
            SET
                base_salary = COALESCE(?, base_salary),
                overtime_rate = COALESCE(?, overtime_rate),
                updated_at = ?
            WHERE
                employee_id = ?
            RETURNING
                id, employee_id, base_salary, overtime_rate, updated_at
        "#))
        .bind(update.base_salary)
        .bind(update.overtime_rate)
        .bind(Utc::now())
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Delete used or expired OTP rows; the identity service owns creation.
    pub async fn purge_expired_otps(&self) -> Result<u64> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM
                otps
            WHERE
                is_used = TRUE
                OR expires_at < ?
        "#))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
