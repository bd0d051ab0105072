use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::database::models::{NewTask, ScheduledTask, TaskPayload};
use crate::database::repositories::{EmployeeRepository, PayrollRepository};
use crate::error::AppError;
use crate::scheduler::TaskQueue;
use crate::services::{AttendanceService, PayrollService};

const RETRY_DELAY_MINUTES: i64 = 5;
pub const DAILY_SECONDS: i64 = 86_400;
pub const HOURLY_SECONDS: i64 = 3_600;

/// Re-register the fixed recurring jobs. Safe to call on every process
/// start: enqueue dedups by task key, so existing live tasks are left alone.
pub async fn register_recurring_jobs<Q: TaskQueue>(queue: &Q) -> Result<()> {
    let now = Utc::now();
    let jobs = [
        (TaskPayload::MarkAbsentOrLeave, DAILY_SECONDS),
        (TaskPayload::FlagMissingCheckouts, DAILY_SECONDS),
        (TaskPayload::GenerateMonthlyPayroll, DAILY_SECONDS),
        (TaskPayload::PurgeExpiredOtps, HOURLY_SECONDS),
    ];

    for (payload, interval) in jobs {
        let key = payload.task_key();
        let inserted = queue
            .enqueue(NewTask::recurring(payload, now, interval))
            .await?;
        if inserted {
            log::info!("Registered recurring job {}", key);
        } else {
            log::debug!("Recurring job {} already scheduled", key);
        }
    }

    Ok(())
}

/// Enqueue the one-shot payroll computation for a newly created period.
/// Returns false when a live task for the period already exists.
pub async fn enqueue_payroll_task<Q: TaskQueue>(
    queue: &Q,
    period_id: uuid::Uuid,
) -> Result<bool> {
    queue
        .enqueue(NewTask::one_shot(
            TaskPayload::GeneratePayroll { period_id },
            Utc::now(),
        ))
        .await
}

/// Whether a failure would recur on every retry. State conflicts and
/// validation failures are settled the moment they happen; only
/// infrastructure errors are worth re-running.
fn permanent_failure(err: &AppError) -> bool {
    matches!(
        err,
        AppError::NotFound(_)
            | AppError::BadRequest(_)
            | AppError::Conflict(_)
            | AppError::Forbidden(_)
    )
}

/// The next occurrence of a recurring task, anchored to its scheduled
/// run_at rather than the wall clock so the cadence never drifts by
/// execution or poll latency.
fn follow_up(task: &ScheduledTask, interval: i64) -> Result<NewTask> {
    let payload: TaskPayload = serde_json::from_value(task.payload.clone())?;
    Ok(NewTask::recurring(
        payload,
        task.run_at + Duration::seconds(interval),
        interval,
    ))
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(date)
        .pred_opt()
        .unwrap_or(date)
}

/// Polls the durable queue and executes due tasks. Execution is
/// at-least-once; every job body is idempotent, so a retried task is safe.
pub struct Worker<Q: TaskQueue> {
    queue: Q,
    attendance: AttendanceService,
    payroll: PayrollService,
    employees: EmployeeRepository,
    payrolls: PayrollRepository,
    poll_interval: std::time::Duration,
}

impl<Q> Worker<Q>
where
    Q: TaskQueue + Clone + Send + Sync + 'static,
{
    pub fn new(
        queue: Q,
        attendance: AttendanceService,
        payroll: PayrollService,
        employees: EmployeeRepository,
        payrolls: PayrollRepository,
    ) -> Self {
        Self {
            queue,
            attendance,
            payroll,
            employees,
            payrolls,
            poll_interval: std::time::Duration::from_secs(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: std::time::Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            log::info!("Scheduler worker started");
            loop {
                match self.run_once().await {
                    Ok(true) => {} // drain the queue before sleeping again
                    Ok(false) => tokio::time::sleep(self.poll_interval).await,
                    Err(err) => {
                        log::error!("Scheduler poll failed: {}", err);
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        })
    }

    /// Claim and execute a single due task. Returns whether one ran.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(task) = self.queue.next_due(Utc::now()).await? else {
            return Ok(false);
        };

        match self.execute(&task).await {
            Ok(()) => {
                self.queue.complete(task.id).await?;
                if let Some(interval) = task.repeat_seconds {
                    self.reschedule(&task, interval).await?;
                }
            }
            Err(err) if err.downcast_ref::<AppError>().is_some_and(permanent_failure) => {
                // A domain-state conflict fails identically on every retry;
                // retire the task instead of hammering it. Recurring jobs
                // still get their next occurrence.
                log::warn!("Task {} failed permanently: {}", task.task_key, err);
                self.queue.complete(task.id).await?;
                if let Some(interval) = task.repeat_seconds {
                    self.reschedule(&task, interval).await?;
                }
            }
            Err(err) => {
                log::error!("Task {} failed: {}", task.task_key, err);
                self.queue
                    .fail_with_retry(
                        task.id,
                        err.to_string(),
                        Duration::minutes(RETRY_DELAY_MINUTES),
                    )
                    .await?;
            }
        }

        Ok(true)
    }

    async fn reschedule(&self, task: &ScheduledTask, interval: i64) -> Result<()> {
        self.queue.enqueue(follow_up(task, interval)?).await?;
        Ok(())
    }

    async fn execute(&self, task: &ScheduledTask) -> Result<()> {
        let payload: TaskPayload = serde_json::from_value(task.payload.clone())?;
        log::info!("Executing task {}", task.task_key);

        match payload {
            TaskPayload::MarkAbsentOrLeave => {
                let yesterday = Utc::now().date_naive() - Duration::days(1);
                let marked = self.attendance.mark_absent_or_on_leave(yesterday).await?;
                log::info!("Marked {} attendance rows for {}", marked, yesterday);
            }
            TaskPayload::FlagMissingCheckouts => {
                let yesterday = Utc::now().date_naive() - Duration::days(1);
                let flagged = self.attendance.flag_missing_checkouts(yesterday).await?;
                log::info!("Flagged {} missing checkouts for {}", flagged, yesterday);
            }
            TaskPayload::GenerateMonthlyPayroll => {
                self.generate_monthly_payroll().await?;
            }
            TaskPayload::PurgeExpiredOtps => {
                let purged = self.employees.purge_expired_otps().await?;
                log::info!("Purged {} expired OTP rows", purged);
            }
            TaskPayload::GeneratePayroll { period_id } => {
                let summary = self.payroll.compute_period(period_id, None).await?;
                log::info!(
                    "Payroll generation completed for period {} ({} employees)",
                    summary.period,
                    summary.result.len()
                );
            }
            TaskPayload::GeneratePayslip { payroll_id } => {
                self.payroll.finish_payslip(payroll_id).await?;
            }
        }

        Ok(())
    }

    /// On the last day of the month, create the month's period (if it does
    /// not exist yet) and enqueue its computation once.
    async fn generate_monthly_payroll(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        if today != last_day_of_month(today) {
            return Ok(());
        }

        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        if let Some(existing) = self.payrolls.find_period_by_range(start, today).await? {
            log::info!("Payroll period {} already exists", existing.id);
            return Ok(());
        }

        let period = self.payrolls.create_period(start, today).await?;
        let enqueued = enqueue_payroll_task(&self.queue, period.id).await?;
        log::info!(
            "Created payroll period {} (computation task enqueued: {})",
            period.id,
            enqueued
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_day_of_month_handles_lengths_and_december() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(last_day_of_month(d(2025, 1, 15)), d(2025, 1, 31));
        assert_eq!(last_day_of_month(d(2025, 4, 1)), d(2025, 4, 30));
        assert_eq!(last_day_of_month(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(last_day_of_month(d(2025, 12, 31)), d(2025, 12, 31));
    }

    #[test]
    fn state_conflicts_are_not_retried_but_infrastructure_errors_are() {
        use crate::error::PayrollError;

        assert!(permanent_failure(&AppError::from(PayrollError::PeriodClosed)));
        assert!(permanent_failure(&AppError::from(
            PayrollError::PeriodNotFound
        )));
        assert!(permanent_failure(&AppError::BadRequest("bad".to_string())));

        assert!(!permanent_failure(&AppError::DatabaseError(
            sqlx::Error::PoolTimedOut
        )));
        assert!(!permanent_failure(&AppError::InternalServerError(None)));
    }

    #[test]
    fn recurring_follow_up_keeps_the_original_cadence() {
        let run_at = "2025-09-01T00:00:00Z".parse().unwrap();
        let task = ScheduledTask {
            id: uuid::Uuid::new_v4(),
            task_key: TaskPayload::MarkAbsentOrLeave.task_key(),
            payload: serde_json::to_value(&TaskPayload::MarkAbsentOrLeave).unwrap(),
            run_at,
            repeat_seconds: Some(DAILY_SECONDS),
            attempts: 1,
            last_error: None,
            locked_at: Some(Utc::now()),
            completed_at: None,
            created_at: Utc::now(),
        };

        // Anchored to run_at, not the wall clock at completion time.
        let next = follow_up(&task, DAILY_SECONDS).unwrap();
        assert_eq!(next.run_at, run_at + Duration::seconds(DAILY_SECONDS));
        assert_eq!(next.task_key, task.task_key);
        assert_eq!(next.repeat_seconds, Some(DAILY_SECONDS));
    }
}
