use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{AttendanceRecord, AttendanceStatus},
    utils::sql,
};

const RECORD_COLUMNS: &str = "id, employee_id, date, check_in, check_out, status";

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_for_date(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?"
        )))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_for_employee(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance
            WHERE employee_id = ? AND date >= ? AND date <= ?
            ORDER BY date
            "#
        )))
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Upsert today's row with a check-in timestamp. Preserves a status set
    /// earlier by a correction; a fresh row starts as present. Returns None
    /// when the row already carries a check-in, so a concurrent double
    /// check-in loses the conflict instead of overwriting the first
    /// timestamp.
    pub async fn upsert_check_in(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        check_in: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            INSERT INTO
                attendance (employee_id, date, check_in, status)
            VALUES
                (?, ?, ?, ?)
            ON CONFLICT (employee_id, date) DO UPDATE
            SET
                check_in = EXCLUDED.check_in
            WHERE
                attendance.check_in IS NULL
            RETURNING {RECORD_COLUMNS}
            "#
        )))
        .bind(employee_id)
        .bind(date)
        .bind(check_in)
        .bind(AttendanceStatus::Present)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn set_check_out(
        &self,
        id: Uuid,
        check_out: DateTime<Utc>,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            UPDATE attendance
            SET check_out = ?, status = ?
            WHERE id = ?
            RETURNING {RECORD_COLUMNS}
            "#
        )))
        .bind(check_out)
        .bind(status)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert a no-show row for the given day. The unique (employee, date)
    /// key makes re-running the daily job a no-op.
    pub async fn insert_if_absent(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<bool> {
        let result = sqlx::query(&sql(r#"
            INSERT INTO
                attendance (employee_id, date, status)
            VALUES
                (?, ?, ?)
            ON CONFLICT (employee_id, date) DO NOTHING
        "#))
        .bind(employee_id)
        .bind(date)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flag every record on `date` with a check-in and no check-out.
    /// Idempotent; already-flagged rows are left as they are.
    pub async fn flag_missing_checkouts(&self, date: NaiveDate) -> Result<u64> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                attendance
            SET
                status = ?
            WHERE
                date = ?
                AND check_in IS NOT NULL
                AND check_out IS NULL
                AND status != ?
        "#))
        .bind(AttendanceStatus::MissingCheckout)
        .bind(date)
        .bind(AttendanceStatus::MissingCheckout)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// HR correction for a missed checkout.
    pub async fn manual_checkout(
        &self,
        id: Uuid,
        check_out: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            UPDATE attendance
            SET check_out = ?, status = ?
            WHERE id = ?
            RETURNING {RECORD_COLUMNS}
            "#
        )))
        .bind(check_out)
        .bind(AttendanceStatus::Present)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
