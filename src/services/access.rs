use crate::database::models::Role;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Employee,
    PaymentProfile,
    Attendance,
    LeaveRequest,
    LeaveBalance,
    PayrollPeriod,
    Payroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    CheckIn,
    CheckOut,
    ManualCheckout,
    Approve,
    Reject,
    Cancel,
    Compute,
    Close,
    GeneratePayslip,
}

/// Explicit per-operation authorization table: which roles may perform an
/// action on a resource. Ownership narrowing (an employee only touching
/// their own rows) is enforced at the handler level.
fn permitted_roles(resource: Resource, action: Action) -> &'static [Role] {
    use Action::*;
    use Resource::*;

    const HR: &[Role] = &[Role::Hr];
    const EMPLOYEE: &[Role] = &[Role::Employee];
    const BOTH: &[Role] = &[Role::Hr, Role::Employee];
    const NOBODY: &[Role] = &[];

    match (resource, action) {
        (Employee, Create) => HR,
        (Employee, Read) => BOTH,

        (PaymentProfile, Read) => BOTH,
        (PaymentProfile, Update) => HR,

        (Attendance, Read) => BOTH,
        (Attendance, CheckIn) => BOTH,
        (Attendance, CheckOut) => BOTH,
        (Attendance, ManualCheckout) => HR,

        (LeaveRequest, Create) => BOTH,
        (LeaveRequest, Read) => BOTH,
        (LeaveRequest, Approve) => HR,
        (LeaveRequest, Reject) => HR,
        (LeaveRequest, Cancel) => EMPLOYEE,

        (LeaveBalance, Read) => BOTH,

        (PayrollPeriod, Create) => HR,
        (PayrollPeriod, Read) => HR,
        (PayrollPeriod, Compute) => HR,
        (PayrollPeriod, Close) => HR,

        (Payroll, Read) => BOTH,
        (Payroll, GeneratePayslip) => BOTH,

        _ => NOBODY,
    }
}

/// Single authorization check run before any handler acts.
pub fn authorize(role: Role, resource: Resource, action: Action) -> Result<(), AppError> {
    if permitted_roles(resource, action).contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not perform this action",
            role
        )))
    }
}
