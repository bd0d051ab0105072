use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use hrcore::database::models::{AttendanceRecord, AttendanceStatus, NewTask, ScheduledTask};
use hrcore::scheduler::{STALE_CLAIM_MINUTES, TaskQueue};

/// In-memory stand-in for the Postgres-backed queue. Mirrors its contract:
/// at most one live row per key, claims are exclusive until they go stale,
/// completion frees the key.
#[derive(Clone, Default)]
pub struct MemoryTaskQueue {
    tasks: Arc<Mutex<Vec<ScheduledTask>>>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.completed_at.is_none())
            .count()
    }

    pub fn find(&self, task_key: &str) -> Option<ScheduledTask> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.task_key == task_key && t.completed_at.is_none())
            .cloned()
    }
}

impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, task: NewTask) -> Result<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks
            .iter()
            .any(|t| t.task_key == task.task_key && t.completed_at.is_none())
        {
            return Ok(false);
        }
        tasks.push(ScheduledTask {
            id: Uuid::new_v4(),
            task_key: task.task_key,
            payload: serde_json::to_value(&task.payload)?,
            run_at: task.run_at,
            repeat_seconds: task.repeat_seconds,
            attempts: 0,
            last_error: None,
            locked_at: None,
            completed_at: None,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn next_due(&self, now: DateTime<Utc>) -> Result<Option<ScheduledTask>> {
        let stale_before = now - Duration::minutes(STALE_CLAIM_MINUTES);
        let mut tasks = self.tasks.lock().unwrap();
        let due = tasks
            .iter_mut()
            .filter(|t| {
                t.completed_at.is_none()
                    && t.locked_at.is_none_or(|locked| locked < stale_before)
                    && t.run_at <= now
            })
            .min_by_key(|t| t.run_at);
        Ok(due.map(|t| {
            t.locked_at = Some(now);
            t.attempts += 1;
            t.clone()
        }))
    }

    async fn complete(&self, id: Uuid) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(t) = tasks.iter_mut().find(|t| t.id == id) {
            t.completed_at = Some(Utc::now());
            t.locked_at = None;
        }
        Ok(())
    }

    async fn fail_with_retry(&self, id: Uuid, error: String, delay: Duration) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(t) = tasks.iter_mut().find(|t| t.id == id) {
            t.last_error = Some(error);
            t.locked_at = None;
            t.run_at = Utc::now() + delay;
        }
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn attendance_on(
    employee_id: Uuid,
    day: NaiveDate,
    status: AttendanceStatus,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> AttendanceRecord {
    AttendanceRecord {
        id: Uuid::new_v4(),
        employee_id,
        date: day,
        check_in,
        check_out,
        status,
    }
}
