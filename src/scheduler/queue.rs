use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use uuid::Uuid;

use crate::database::models::{NewTask, ScheduledTask};

/// A claim older than this is treated as abandoned (the worker crashed
/// before completing or releasing it) and the task is delivered again.
pub const STALE_CLAIM_MINUTES: i64 = 15;

/// Durable at-least-once task queue keyed by a unique string name.
///
/// Implementations must guarantee at most one live (uncompleted) task per
/// key; `enqueue` returns false instead of inserting a duplicate. Repeated
/// execution of a task is made safe by application-level idempotency, not by
/// the queue.
pub trait TaskQueue {
    /// Insert a task unless a live task with the same key exists. Returns
    /// whether a row was inserted.
    fn enqueue(&self, task: NewTask) -> impl Future<Output = Result<bool>> + Send;

    /// Claim the next due task, if any. A task is claimable when it is
    /// unclaimed or its previous claim is older than the stale cutoff.
    fn next_due(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<ScheduledTask>>> + Send;

    /// Mark a claimed task as done; its key becomes free for re-use.
    fn complete(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    /// Release a claimed task back to the queue for a later retry.
    fn fail_with_retry(
        &self,
        id: Uuid,
        error: String,
        delay: Duration,
    ) -> impl Future<Output = Result<()>> + Send;
}
