use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::access::{Action, Resource, authorize};
use crate::services::{AttendanceService, Claims};

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// HR may check in on behalf of an employee; employees check themselves in.
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ManualCheckoutRequest {
    pub check_out: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub employee_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn resolve_employee(claims: &Claims, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    if claims.is_hr() {
        if let Some(id) = requested {
            return Ok(id);
        }
    }
    claims.require_employee_id()
}

pub async fn check_in(
    claims: Claims,
    service: web::Data<AttendanceService>,
    input: web::Json<CheckInRequest>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Attendance, Action::CheckIn)?;
    let employee_id = resolve_employee(&claims, input.employee_id)?;

    let record = service.check_in(employee_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

pub async fn check_out(
    claims: Claims,
    service: web::Data<AttendanceService>,
    input: web::Json<CheckInRequest>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Attendance, Action::CheckOut)?;
    let employee_id = resolve_employee(&claims, input.employee_id)?;

    let record = service.check_out(employee_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

/// HR correction for a record stuck on missing_checkout.
pub async fn manual_checkout(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
    input: web::Json<ManualCheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Attendance, Action::ManualCheckout)?;

    let record = service
        .manual_checkout(path.into_inner(), input.check_out)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

/// Employees see their own records; HR may query anyone's.
pub async fn get_records(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Attendance, Action::Read)?;
    let employee_id = resolve_employee(&claims, query.employee_id)?;

    let records = service
        .records_for_employee(employee_id, query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(records)))
}
