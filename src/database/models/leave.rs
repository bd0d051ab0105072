use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::error::LeaveError;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum LeaveType {
        Casual => "casual",
        Sick => "sick",
        Unpaid => "unpaid",
        Other => "other",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl LeaveType {
    /// Unpaid leave is the only type that does not count toward pay.
    pub fn is_paid(&self) -> bool {
        !matches!(self, LeaveType::Unpaid)
    }

    /// Casual and sick leave draw down the yearly balance; other types are
    /// not balance-tracked.
    pub fn is_balance_tracked(&self) -> bool {
        matches!(self, LeaveType::Casual | LeaveType::Sick)
    }
}

impl LeaveStatus {
    /// pending -> approved | rejected | cancelled; terminal after that.
    pub fn can_transition_to(&self, next: LeaveStatus) -> bool {
        matches!(self, LeaveStatus::Pending) && next != LeaveStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub is_paid: bool,
    pub action_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Inclusive day count between start and end.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestInput {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

/// Yearly leave counters. Never negative; decremented only at approval, in
/// the same transaction as the status transition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub year: i32,
    pub casual: i32,
    pub sick: i32,
}

impl LeaveBalance {
    pub fn remaining(&self, leave_type: LeaveType) -> i32 {
        match leave_type {
            LeaveType::Casual => self.casual,
            LeaveType::Sick => self.sick,
            _ => 0,
        }
    }

    /// Deduct `days` from the tracked counter, failing without mutation when
    /// the balance is insufficient.
    pub fn deduct(&mut self, leave_type: LeaveType, days: i64) -> Result<(), LeaveError> {
        let counter = match leave_type {
            LeaveType::Casual => &mut self.casual,
            LeaveType::Sick => &mut self.sick,
            _ => return Ok(()),
        };
        if i64::from(*counter) < days {
            return Err(LeaveError::InsufficientBalance {
                leave_type: leave_type.to_string(),
            });
        }
        *counter -= days as i32;
        Ok(())
    }
}
