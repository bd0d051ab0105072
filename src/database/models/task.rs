use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque, idempotent unit of deferred work. At most one live
/// (uncompleted) row per task_key, enforced by a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: Uuid,
    pub task_key: String,
    pub payload: serde_json::Value,
    pub run_at: DateTime<Utc>,
    pub repeat_seconds: Option<i64>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_key: String,
    pub payload: TaskPayload,
    pub run_at: DateTime<Utc>,
    pub repeat_seconds: Option<i64>,
}

/// Work dispatched by the scheduler worker. Serialized into the task row's
/// payload column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum TaskPayload {
    MarkAbsentOrLeave,
    FlagMissingCheckouts,
    GenerateMonthlyPayroll,
    PurgeExpiredOtps,
    GeneratePayroll { period_id: Uuid },
    GeneratePayslip { payroll_id: Uuid },
}

impl TaskPayload {
    /// Stable key used to deduplicate scheduled work.
    pub fn task_key(&self) -> String {
        match self {
            TaskPayload::MarkAbsentOrLeave => "auto-mark-absent-or-leave".to_string(),
            TaskPayload::FlagMissingCheckouts => "auto-flag-missing-checkout".to_string(),
            TaskPayload::GenerateMonthlyPayroll => "auto-generate-monthly-payroll".to_string(),
            TaskPayload::PurgeExpiredOtps => "purge-expired-otps".to_string(),
            TaskPayload::GeneratePayroll { period_id } => {
                format!("generate-payroll-period-{}", period_id)
            }
            TaskPayload::GeneratePayslip { payroll_id } => {
                format!("generate-payslip-{}", payroll_id)
            }
        }
    }
}

impl NewTask {
    pub fn one_shot(payload: TaskPayload, run_at: DateTime<Utc>) -> Self {
        NewTask {
            task_key: payload.task_key(),
            payload,
            run_at,
            repeat_seconds: None,
        }
    }

    pub fn recurring(payload: TaskPayload, run_at: DateTime<Utc>, repeat_seconds: i64) -> Self {
        NewTask {
            task_key: payload.task_key(),
            payload,
            run_at,
            repeat_seconds: Some(repeat_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payroll_task_key_is_stable_per_period() {
        let period_id = Uuid::nil();
        let payload = TaskPayload::GeneratePayroll { period_id };
        assert_eq!(
            payload.task_key(),
            format!("generate-payroll-period-{}", period_id)
        );
        // Re-deriving the key for the same period gives the same string.
        assert_eq!(
            payload.task_key(),
            TaskPayload::GeneratePayroll { period_id }.task_key()
        );
    }

    #[test]
    fn payload_round_trips_through_json() {
        let payload = TaskPayload::GeneratePayslip {
            payroll_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["job"], "generate_payslip");
        let back: TaskPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }
}
