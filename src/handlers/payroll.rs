use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{NewTask, PayrollPeriodInput, TaskPayload};
use crate::database::repositories::PgTaskQueue;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::scheduler::TaskQueue;
use crate::services::access::{Action, Resource, authorize};
use crate::services::{Claims, PayrollService};

#[derive(Debug, Deserialize)]
pub struct ComputeQuery {
    pub employee_id: Option<Uuid>,
}

/// Create a period and enqueue its one-shot computation task. The task key
/// is derived from the period id, so re-creating the same period concept
/// never yields two live tasks.
pub async fn create_period(
    claims: Claims,
    service: web::Data<PayrollService>,
    queue: web::Data<PgTaskQueue>,
    input: web::Json<PayrollPeriodInput>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PayrollPeriod, Action::Create)?;

    let period = service.create_period(&input).await?;
    let enqueued = queue
        .enqueue(NewTask::one_shot(
            TaskPayload::GeneratePayroll {
                period_id: period.id,
            },
            chrono::Utc::now(),
        ))
        .await?;

    let message = if enqueued {
        "Payroll period created; computation scheduled"
    } else {
        "Payroll period created; computation already scheduled"
    };
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(Some(period), message)))
}

pub async fn get_periods(
    claims: Claims,
    service: web::Data<PayrollService>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PayrollPeriod, Action::Read)?;

    let periods = service.list_periods().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(periods)))
}

/// Synchronous (re)computation, optionally for a single employee.
pub async fn compute_period(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
    query: web::Query<ComputeQuery>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PayrollPeriod, Action::Compute)?;

    let summary = service
        .compute_period(path.into_inner(), query.employee_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

pub async fn close_period(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PayrollPeriod, Action::Close)?;

    let period = service.close_period(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(period)))
}

pub async fn get_period_records(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PayrollPeriod, Action::Read)?;

    let records = service.records_for_period(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(records)))
}

/// Employees see their own payroll records; HR sees anyone's.
pub async fn get_my_records(
    claims: Claims,
    service: web::Data<PayrollService>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Payroll, Action::Read)?;

    let employee_id = claims.require_employee_id()?;
    let records = service.records_for_employee(employee_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(records)))
}

/// Acquire the single-writer guard and hand generation to the scheduler.
pub async fn generate_payslip(
    claims: Claims,
    service: web::Data<PayrollService>,
    queue: web::Data<PgTaskQueue>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Payroll, Action::GeneratePayslip)?;
    let payroll_id = path.into_inner();

    let record = service
        .find_record(payroll_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payroll record not found".to_string()))?;
    if !claims.is_hr() && !claims.owns(record.employee_id) {
        return Err(AppError::Forbidden(
            "Can only generate your own payslip".to_string(),
        ));
    }

    service.begin_payslip(payroll_id).await?;
    queue
        .enqueue(NewTask::one_shot(
            TaskPayload::GeneratePayslip { payroll_id },
            chrono::Utc::now(),
        ))
        .await?;

    Ok(HttpResponse::Accepted().json(ApiResponse::<()>::success_with_message(
        None,
        "Payslip generation started. Please check later.",
    )))
}
