use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{LeaveBalance, LeaveRequest, LeaveRequestInput, LeaveStatus},
    utils::sql,
};

const REQUEST_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, \
                               status, is_paid, action_by, created_at";
const BALANCE_COLUMNS: &str = "id, employee_id, year, casual, sick";

#[derive(Clone)]
pub struct LeaveRepository {
    pool: PgPool,
}

impl LeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_request(
        &self,
        employee_id: Uuid,
        input: &LeaveRequestInput,
        is_paid: bool,
    ) -> Result<LeaveRequest> {
        let request = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            r#"
            INSERT INTO
                leave_requests (employee_id, leave_type, start_date, end_date, reason, status, is_paid)
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            RETURNING {REQUEST_COLUMNS}
            "#
        )))
        .bind(employee_id)
        .bind(input.leave_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.reason)
        .bind(LeaveStatus::Pending)
        .bind(is_paid)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>> {
        let request = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Lock the request row for the span of the approval transaction.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<LeaveRequest>> {
        let request = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE"
        )))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(request)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests
            WHERE employee_id = ?
            ORDER BY created_at DESC
            "#
        )))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    pub async fn list_all(&self) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests ORDER BY created_at DESC"
        )))
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// A duplicate is a live (pending or approved) request for the exact same
    /// window; cancelled and rejected requests may be re-filed.
    pub async fn duplicate_exists(
        &self,
        employee_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                leave_requests
            WHERE
                employee_id = ?
                AND start_date = ?
                AND end_date = ?
                AND status IN ('pending', 'approved')
        "#))
        .bind(employee_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: LeaveStatus,
        action_by: Uuid,
    ) -> Result<LeaveRequest> {
        let request = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            r#"
            UPDATE leave_requests
            SET status = ?, action_by = ?
            WHERE id = ?
            RETURNING {REQUEST_COLUMNS}
            "#
        )))
        .bind(status)
        .bind(action_by)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(request)
    }

    /// Single source of truth for "day is covered by approved leave", used by
    /// the daily absence-marking job.
    pub async fn approved_leave_covers(&self, employee_id: Uuid, date: NaiveDate) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                leave_requests
            WHERE
                employee_id = ?
                AND status = 'approved'
                AND start_date <= ?
                AND end_date >= ?
        "#))
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Approved unpaid leave requests overlapping [start, end].
    pub async fn approved_unpaid_overlapping(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests
            WHERE employee_id = ?
                AND status = 'approved'
                AND is_paid = FALSE
                AND start_date <= ?
                AND end_date >= ?
            "#
        )))
        .bind(employee_id)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Read-or-create the employee's balance row for `year`, locked for the
    /// span of the caller's transaction so concurrent approvals serialize.
    pub async fn balance_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        employee_id: Uuid,
        year: i32,
        default_casual: i32,
        default_sick: i32,
    ) -> Result<LeaveBalance> {
        sqlx::query(&sql(r#"
            INSERT INTO
                leave_balances (employee_id, year, casual, sick)
            VALUES
                (?, ?, ?, ?)
            ON CONFLICT (employee_id, year) DO NOTHING
        "#))
        .bind(employee_id)
        .bind(year)
        .bind(default_casual)
        .bind(default_sick)
        .execute(&mut **tx)
        .await?;

        let balance = sqlx::query_as::<_, LeaveBalance>(&sql(&format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ? FOR UPDATE"
        )))
        .bind(employee_id)
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;

        Ok(balance)
    }

    pub async fn balance(&self, employee_id: Uuid, year: i32) -> Result<Option<LeaveBalance>> {
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql(&format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ?"
        )))
        .bind(employee_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Insert the initial balance row during onboarding.
    pub async fn create_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        employee_id: Uuid,
        year: i32,
        casual: i32,
        sick: i32,
    ) -> Result<LeaveBalance> {
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql(&format!(
            r#"
            INSERT INTO leave_balances (employee_id, year, casual, sick)
            VALUES (?, ?, ?, ?)
            RETURNING {BALANCE_COLUMNS}
            "#
        )))
        .bind(employee_id)
        .bind(year)
        .bind(casual)
        .bind(sick)
        .fetch_one(&mut **tx)
        .await?;

        Ok(balance)
    }

    pub async fn save_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        balance: &LeaveBalance,
    ) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                leave_balances
            SET
                casual = ?,
                sick = ?
            WHERE
                id = ?
        "#))
        .bind(balance.casual)
        .bind(balance.sick)
        .bind(balance.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

// Year derivation for new balance rows lives with the callers; kept here so
// both onboarding and approval agree on it.
pub fn current_year() -> i32 {
    use chrono::Datelike;
    Utc::now().year()
}
