use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum Role {
        Hr => "hr",
        Employee => "employee",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: NaiveDate,
    pub bank_account: Option<String>,
    pub ifsc_code: Option<String>,
    pub is_verified: bool,
    pub pending_update: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub fullname: String,
    pub email: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub bank_account: Option<String>,
    pub ifsc_code: Option<String>,
}

/// Per-employee pay parameters. One-to-one with Employee; mutated by HR
/// only, read by the payroll engine.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProfile {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub base_salary: BigDecimal,  // NUMERIC(10,2)
    pub overtime_rate: BigDecimal, // NUMERIC(7,2), per overtime hour
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProfileUpdateInput {
    pub base_salary: Option<BigDecimal>,
    pub overtime_rate: Option<BigDecimal>,
}
