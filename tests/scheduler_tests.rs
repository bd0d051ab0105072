use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use hrcore::database::models::{NewTask, TaskPayload};
use hrcore::scheduler::{TaskQueue, enqueue_payroll_task, register_recurring_jobs};

mod common;

use common::MemoryTaskQueue;

#[tokio::test]
async fn enqueue_dedups_on_live_task_key() {
    let queue = MemoryTaskQueue::new();
    let period_id = Uuid::new_v4();

    assert!(enqueue_payroll_task(&queue, period_id).await.unwrap());
    // A second enqueue for the same period is a no-op.
    assert!(!enqueue_payroll_task(&queue, period_id).await.unwrap());
    assert_eq!(queue.live_count(), 1);

    // A different period gets its own task.
    assert!(enqueue_payroll_task(&queue, Uuid::new_v4()).await.unwrap());
    assert_eq!(queue.live_count(), 2);
}

#[tokio::test]
async fn completing_a_task_frees_its_key() {
    let queue = MemoryTaskQueue::new();
    let period_id = Uuid::new_v4();

    assert!(enqueue_payroll_task(&queue, period_id).await.unwrap());
    let task = queue.next_due(Utc::now()).await.unwrap().unwrap();
    queue.complete(task.id).await.unwrap();

    // Once completed, the same key may be enqueued again.
    assert!(enqueue_payroll_task(&queue, period_id).await.unwrap());
}

#[tokio::test]
async fn next_due_skips_future_and_claimed_tasks() {
    let queue = MemoryTaskQueue::new();
    let now = Utc::now();

    queue
        .enqueue(NewTask::one_shot(
            TaskPayload::GeneratePayroll {
                period_id: Uuid::new_v4(),
            },
            now + Duration::hours(1),
        ))
        .await
        .unwrap();
    assert!(queue.next_due(now).await.unwrap().is_none());

    queue
        .enqueue(NewTask::one_shot(TaskPayload::MarkAbsentOrLeave, now))
        .await
        .unwrap();
    let claimed = queue.next_due(now).await.unwrap().unwrap();
    assert_eq!(claimed.task_key, "auto-mark-absent-or-leave");
    assert_eq!(claimed.attempts, 1);

    // The claimed task is not handed out a second time.
    assert!(queue.next_due(now).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_task_is_rescheduled_with_its_error() {
    let queue = MemoryTaskQueue::new();
    let now = Utc::now();

    queue
        .enqueue(NewTask::one_shot(TaskPayload::FlagMissingCheckouts, now))
        .await
        .unwrap();
    let task = queue.next_due(now).await.unwrap().unwrap();
    queue
        .fail_with_retry(task.id, "connection reset".to_string(), Duration::minutes(5))
        .await
        .unwrap();

    // Not due again until the retry delay has elapsed.
    assert!(queue.next_due(Utc::now()).await.unwrap().is_none());
    let retried = queue
        .next_due(Utc::now() + Duration::minutes(6))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(retried.id, task.id);
    assert_eq!(retried.attempts, 2);
    assert_eq!(retried.last_error.as_deref(), Some("connection reset"));
}

#[tokio::test]
async fn stale_claim_from_a_crashed_worker_is_redelivered() {
    let queue = MemoryTaskQueue::new();
    let now = Utc::now();

    queue
        .enqueue(NewTask::recurring(TaskPayload::MarkAbsentOrLeave, now, 86_400))
        .await
        .unwrap();
    let claimed = queue.next_due(now).await.unwrap().unwrap();
    // The worker dies here: neither complete nor fail_with_retry runs.

    // The claim still holds while fresh, and re-registration cannot slip a
    // duplicate past the live key.
    assert!(
        queue
            .next_due(now + Duration::minutes(5))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        !queue
            .enqueue(NewTask::recurring(TaskPayload::MarkAbsentOrLeave, now, 86_400))
            .await
            .unwrap()
    );

    // Once the claim goes stale the same task is handed out again.
    let redelivered = queue
        .next_due(now + Duration::minutes(20))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(redelivered.id, claimed.id);
    assert_eq!(redelivered.attempts, 2);
}

#[tokio::test]
async fn recurring_registration_is_idempotent() {
    let queue = MemoryTaskQueue::new();

    register_recurring_jobs(&queue).await.unwrap();
    assert_eq!(queue.live_count(), 4);

    // A restart re-registers without duplicating anything.
    register_recurring_jobs(&queue).await.unwrap();
    assert_eq!(queue.live_count(), 4);

    let daily = queue.find("auto-mark-absent-or-leave").unwrap();
    assert_eq!(daily.repeat_seconds, Some(86_400));
    let hourly = queue.find("purge-expired-otps").unwrap();
    assert_eq!(hourly.repeat_seconds, Some(3_600));
}
