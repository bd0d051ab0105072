pub mod attendance;
pub mod employee;
pub mod leave;
pub mod payroll;
pub mod task;

// Re-export all repositories for easy importing
pub use attendance::AttendanceRepository;
pub use employee::EmployeeRepository;
pub use leave::LeaveRepository;
pub use payroll::PayrollRepository;
pub use task::PgTaskQueue;
