pub mod attendance;
pub mod employee;
pub mod leave;
pub mod macros;
pub mod payroll;
pub mod task;

// Re-export all models for easy importing
pub use attendance::*;
pub use employee::*;
pub use leave::*;
pub use payroll::*;
pub use task::*;
