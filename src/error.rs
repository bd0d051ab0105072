use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

/// Attendance ledger state conflicts. Check-in/check-out are rejected
/// synchronously; the caller must not retry blindly.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("No check-in record for today")]
    NoCheckIn,

    #[error("Already checked out")]
    AlreadyCheckedOut,

    #[error("Check-out time cannot be before check-in time")]
    InvalidOrder,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LeaveError {
    #[error("End date must not precede start date")]
    InvalidDates,

    #[error("A leave request for this date range already exists")]
    DuplicateRequest,

    #[error("Leave request is not pending")]
    InvalidState,

    #[error("Not allowed to act on this leave request")]
    NotAllowed,

    #[error("Not enough {leave_type} leave balance")]
    InsufficientBalance { leave_type: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayrollError {
    #[error("Payroll period not found")]
    PeriodNotFound,

    #[error("Payroll period is closed")]
    PeriodClosed,

    #[error("A payroll period for this date range already exists")]
    DuplicatePeriod,

    #[error("End date must not precede start date")]
    InvalidDates,

    #[error("Payslip is being generated. Please check later.")]
    GenerationInProgress,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        log::error!(
            "Request failed with status {}: {}",
            status_code,
            error_message
        );

        let response_body = ApiResponse::<()>::error(&error_message);

        HttpResponse::build(status_code).json(response_body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        if error.is::<sqlx::Error>() {
            match error.downcast::<sqlx::Error>() {
                Ok(sqlx_err) => return AppError::DatabaseError(sqlx_err),
                Err(original_error) => {
                    return AppError::InternalServerError(Some(original_error.to_string()));
                }
            }
        }

        AppError::InternalServerError(Some(error.to_string()))
    }
}

impl From<AttendanceError> for AppError {
    fn from(error: AttendanceError) -> Self {
        match error {
            AttendanceError::NoCheckIn => AppError::BadRequest(error.to_string()),
            _ => AppError::Conflict(error.to_string()),
        }
    }
}

impl From<LeaveError> for AppError {
    fn from(error: LeaveError) -> Self {
        match error {
            LeaveError::InvalidDates => AppError::BadRequest(error.to_string()),
            LeaveError::NotAllowed => AppError::Forbidden(error.to_string()),
            _ => AppError::Conflict(error.to_string()),
        }
    }
}

impl From<PayrollError> for AppError {
    fn from(error: PayrollError) -> Self {
        match error {
            PayrollError::PeriodNotFound => AppError::NotFound(error.to_string()),
            PayrollError::InvalidDates => AppError::BadRequest(error.to_string()),
            _ => AppError::Conflict(error.to_string()),
        }
    }
}

impl AppError {
    pub fn internal_server_error_message(message: impl Into<String>) -> Self {
        AppError::InternalServerError(Some(message.into()))
    }

    pub fn internal_server_error() -> Self {
        AppError::InternalServerError(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_conflicts_map_to_409() {
        assert_eq!(
            AppError::from(PayrollError::PeriodClosed).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(PayrollError::GenerationInProgress).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(AttendanceError::AlreadyCheckedIn).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(LeaveError::InsufficientBalance {
                leave_type: "casual".to_string()
            })
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_and_permission_mappings() {
        assert_eq!(
            AppError::from(PayrollError::InvalidDates).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PayrollError::PeriodNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AttendanceError::NoCheckIn).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(LeaveError::NotAllowed).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
