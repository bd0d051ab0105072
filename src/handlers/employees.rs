use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{EmployeeInput, PaymentProfileUpdateInput};
use crate::database::repositories::EmployeeRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::access::{Action, Resource, authorize};
use crate::services::{Claims, EmployeeService};

/// Onboarding creates the employee together with its payment profile and
/// leave balance in one transaction.
pub async fn onboard(
    claims: Claims,
    service: web::Data<EmployeeService>,
    input: web::Json<EmployeeInput>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Employee, Action::Create)?;

    let employee = service.onboard(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(employee)))
}

pub async fn get_employees(
    claims: Claims,
    service: web::Data<EmployeeService>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Employee, Action::Read)?;

    let employees = if claims.is_hr() {
        service.list().await?
    } else {
        let employee_id = claims.require_employee_id()?;
        service.find(employee_id).await?.into_iter().collect()
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(employees)))
}

pub async fn get_employee(
    claims: Claims,
    service: web::Data<EmployeeService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::Employee, Action::Read)?;
    let employee_id = path.into_inner();

    if !claims.is_hr() && !claims.owns(employee_id) {
        return Err(AppError::Forbidden(
            "Can only view your own profile".to_string(),
        ));
    }

    let employee = service
        .find(employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(employee)))
}

pub async fn get_payment_profile(
    claims: Claims,
    service: web::Data<EmployeeService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PaymentProfile, Action::Read)?;
    let employee_id = path.into_inner();

    if !claims.is_hr() && !claims.owns(employee_id) {
        return Err(AppError::Forbidden(
            "Can only view your own payment profile".to_string(),
        ));
    }

    let profile = service.payment_profile(employee_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// HR mutates pay parameters directly on the repository.
pub async fn update_payment_profile(
    claims: Claims,
    repo: web::Data<EmployeeRepository>,
    path: web::Path<Uuid>,
    input: web::Json<PaymentProfileUpdateInput>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::PaymentProfile, Action::Update)?;

    let profile = repo
        .update_payment_profile(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Payment profile missing".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}
