use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{PayrollPeriod, PayrollRecord, PayrollStatus},
    utils::sql,
};

const PERIOD_COLUMNS: &str = "id, start_date, end_date, is_closed";
const RECORD_COLUMNS: &str = "id, employee_id, period_id, gross, overtime_pay, deductions, net, \
                              currency, breakdown, payslip_file, status, generated_at, is_generating";

#[derive(Clone)]
pub struct PayrollRepository {
    pool: PgPool,
}

impl PayrollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_period(&self, start: NaiveDate, end: NaiveDate) -> Result<PayrollPeriod> {
        let period = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            r#"
            INSERT INTO payroll_periods (start_date, end_date)
            VALUES (?, ?)
            RETURNING {PERIOD_COLUMNS}
            "#
        )))
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(period)
    }

    pub async fn find_period(&self, id: Uuid) -> Result<Option<PayrollPeriod>> {
        let period = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            "SELECT {PERIOD_COLUMNS} FROM payroll_periods WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(period)
    }

    pub async fn find_period_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PayrollPeriod>> {
        let period = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            "SELECT {PERIOD_COLUMNS} FROM payroll_periods WHERE start_date = ? AND end_date = ?"
        )))
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(period)
    }

    pub async fn list_periods(&self) -> Result<Vec<PayrollPeriod>> {
        let periods = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            "SELECT {PERIOD_COLUMNS} FROM payroll_periods ORDER BY start_date DESC"
        )))
        .fetch_all(&self.pool)
        .await?;

        Ok(periods)
    }

    /// Exclusive lock on the period row; serializes concurrent computation
    /// of the same period while other periods proceed in parallel.
    pub async fn find_period_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<PayrollPeriod>> {
        let period = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            "SELECT {PERIOD_COLUMNS} FROM payroll_periods WHERE id = ? FOR UPDATE"
        )))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(period)
    }

    /// Close the period and finalize its draft rows as one atomic unit.
    pub async fn close_period(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<PayrollPeriod> {
        let period = sqlx::query_as::<_, PayrollPeriod>(&sql(&format!(
            r#"
            UPDATE payroll_periods
            SET is_closed = TRUE
            WHERE id = ?
            RETURNING {PERIOD_COLUMNS}
            "#
        )))
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(&sql(r#"
            UPDATE
                payrolls
            SET
                status = ?
            WHERE
                period_id = ?
                AND status = ?
        "#))
        .bind(PayrollStatus::Finalized)
        .bind(id)
        .bind(PayrollStatus::Draft)
        .execute(&mut **tx)
        .await?;

        Ok(period)
    }

    /// Upsert on the (employee, period) key; recomputation overwrites, never
    /// appends.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        employee_id: Uuid,
        period_id: Uuid,
        gross: &BigDecimal,
        overtime_pay: &BigDecimal,
        deductions: &BigDecimal,
        net: &BigDecimal,
        currency: &str,
        breakdown: &serde_json::Value,
        status: PayrollStatus,
    ) -> Result<PayrollRecord> {
        let record = sqlx::query_as::<_, PayrollRecord>(&sql(&format!(
            r#"
            INSERT INTO
                payrolls (employee_id, period_id, gross, overtime_pay, deductions, net,
                          currency, breakdown, status, generated_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (employee_id, period_id) DO UPDATE
            SET
                gross = EXCLUDED.gross,
                overtime_pay = EXCLUDED.overtime_pay,
                deductions = EXCLUDED.deductions,
                net = EXCLUDED.net,
                currency = EXCLUDED.currency,
                breakdown = EXCLUDED.breakdown,
                status = EXCLUDED.status,
                generated_at = EXCLUDED.generated_at
            RETURNING {RECORD_COLUMNS}
            "#
        )))
        .bind(employee_id)
        .bind(period_id)
        .bind(gross)
        .bind(overtime_pay)
        .bind(deductions)
        .bind(net)
        .bind(currency)
        .bind(breakdown)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn find_record(&self, id: Uuid) -> Result<Option<PayrollRecord>> {
        let record = sqlx::query_as::<_, PayrollRecord>(&sql(&format!(
            "SELECT {RECORD_COLUMNS} FROM payrolls WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_records_for_period(&self, period_id: Uuid) -> Result<Vec<PayrollRecord>> {
        let records = sqlx::query_as::<_, PayrollRecord>(&sql(&format!(
            "SELECT {RECORD_COLUMNS} FROM payrolls WHERE period_id = ? ORDER BY generated_at DESC"
        )))
        .bind(period_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_records_for_employee(&self, employee_id: Uuid) -> Result<Vec<PayrollRecord>> {
        let records = sqlx::query_as::<_, PayrollRecord>(&sql(&format!(
            "SELECT {RECORD_COLUMNS} FROM payrolls WHERE employee_id = ? ORDER BY generated_at DESC"
        )))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Single-writer guard: flips is_generating false -> true, returning
    /// false when another generation is already in flight.
    pub async fn try_begin_generation(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                payrolls
            SET
                is_generating = TRUE
            WHERE
                id = ?
                AND is_generating = FALSE
        "#))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clear the guard and record the artifact reference, if any.
    pub async fn finish_generation(&self, id: Uuid, payslip_file: Option<&str>) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                payrolls
            SET
                is_generating = FALSE,
                payslip_file = COALESCE(?, payslip_file)
            WHERE
                id = ?
        "#))
        .bind(payslip_file)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
