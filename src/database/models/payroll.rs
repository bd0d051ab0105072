use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum PayrollStatus {
        Draft => "draft",
        Finalized => "finalized",
        Paid => "paid",
    }
}

/// A contiguous date range for which payroll is computed once. Unique on
/// (start_date, end_date); closing freezes it against recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPeriod {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPeriodInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub period_id: Uuid,
    pub gross: BigDecimal,
    pub overtime_pay: BigDecimal,
    pub deductions: BigDecimal,
    pub net: BigDecimal,
    pub currency: String,
    pub breakdown: serde_json::Value,
    pub payslip_file: Option<String>,
    pub status: PayrollStatus,
    pub generated_at: DateTime<Utc>,
    pub is_generating: bool,
}

/// Stable, serializable computation breakdown stored on each payroll row.
/// Money and hours are 2-decimal strings; day counts are plain integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBreakdown {
    pub daily_rate: String,
    pub paid_days: i64,
    pub unpaid_days: i64,
    pub overtime_hours: String,
    pub base_salary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRow {
    pub employee: String,
    pub gross: BigDecimal,
    pub net: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRunSummary {
    pub message: String,
    pub period: String,
    pub result: Vec<PayrollRow>,
}
