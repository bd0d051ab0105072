pub mod access;
pub mod attendance;
pub mod auth;
pub mod employee;
pub mod leave;
pub mod payroll;

pub use access::{Action, Resource, authorize};
pub use attendance::AttendanceService;
pub use auth::Claims;
pub use employee::EmployeeService;
pub use leave::LeaveService;
pub use payroll::PayrollService;
