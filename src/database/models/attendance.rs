use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AttendanceStatus {
        Present => "present",
        Absent => "absent",
        OnLeave => "on_leave",
        MissingCheckout => "missing_checkout",
        Late => "late",
    }
}

/// One row per (employee, date), enforced by a unique constraint. Created by
/// check-in or by the daily absence-marking job; never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Hours between check-in and check-out, rounded half-up to 2 decimals.
    /// Zero when either timestamp is missing.
    pub fn hours_worked(&self) -> BigDecimal {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => hours_between(check_in, check_out),
            _ => BigDecimal::from(0),
        }
    }

    pub fn overtime_hours(&self, standard_work_hours: &BigDecimal) -> BigDecimal {
        let hours = self.hours_worked();
        if &hours > standard_work_hours {
            hours - standard_work_hours
        } else {
            BigDecimal::from(0)
        }
    }
}

pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> BigDecimal {
    let seconds = (end - start).num_seconds();
    (BigDecimal::from(seconds) / BigDecimal::from(3600)).with_scale_round(2, RoundingMode::HalfUp)
}
