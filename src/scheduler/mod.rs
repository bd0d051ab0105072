pub mod queue;
pub mod worker;

pub use queue::{STALE_CLAIM_MINUTES, TaskQueue};
pub use worker::{Worker, enqueue_payroll_task, register_recurring_jobs};
