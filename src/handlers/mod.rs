pub mod attendance;
pub mod employees;
pub mod leave;
pub mod payroll;
pub mod shared;

pub use shared::ApiResponse;
