use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{NewTask, ScheduledTask},
    utils::sql,
};
use crate::scheduler::{STALE_CLAIM_MINUTES, TaskQueue};

const TASK_COLUMNS: &str = "id, task_key, payload, run_at, repeat_seconds, attempts, last_error, \
                            locked_at, completed_at, created_at";

/// Durable task queue backed by the scheduled_tasks table. Key dedup rides
/// on a partial unique index over uncompleted rows; claiming uses
/// FOR UPDATE SKIP LOCKED so a pool of workers never double-claims.
#[derive(Clone)]
pub struct PgTaskQueue {
    pool: PgPool,
}

impl PgTaskQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TaskQueue for PgTaskQueue {
    async fn enqueue(&self, task: NewTask) -> Result<bool> {
        let payload = serde_json::to_value(&task.payload)?;

        let result = sqlx::query(&sql(r#"
            INSERT INTO
                scheduled_tasks (task_key, payload, run_at, repeat_seconds)
            VALUES
                (?, ?, ?, ?)
            ON CONFLICT (task_key) WHERE completed_at IS NULL DO NOTHING
        "#))
        .bind(&task.task_key)
        .bind(payload)
        .bind(task.run_at)
        .bind(task.repeat_seconds)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn next_due(&self, now: DateTime<Utc>) -> Result<Option<ScheduledTask>> {
        // A claim from a crashed worker is released by age: rows whose
        // locked_at is older than the stale cutoff are claimable again.
        let stale_before = now - Duration::minutes(STALE_CLAIM_MINUTES);

        let task = sqlx::query_as::<_, ScheduledTask>(&sql(&format!(
            r#"
            UPDATE scheduled_tasks
            SET locked_at = ?, attempts = attempts + 1
            WHERE id = (
                SELECT id
                FROM scheduled_tasks
                WHERE completed_at IS NULL
                    AND (locked_at IS NULL OR locked_at < ?)
                    AND run_at <= ?
                ORDER BY run_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {TASK_COLUMNS}
            "#
        )))
        .bind(now)
        .bind(stale_before)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn complete(&self, id: Uuid) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                scheduled_tasks
            SET
                completed_at = ?
            WHERE
                id = ?
        "#))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail_with_retry(&self, id: Uuid, error: String, delay: Duration) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                scheduled_tasks
            SET
                locked_at = NULL,
                last_error = ?,
                run_at = ?
            WHERE
                id = ?
        "#))
        .bind(error)
        .bind(Utc::now() + delay)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
