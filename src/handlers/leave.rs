use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::LeaveRequestInput;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::access::{Action, Resource, authorize};
use crate::services::{Claims, LeaveService};

pub async fn create_request(
    claims: Claims,
    service: web::Data<LeaveService>,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Create)?;
    let employee_id = claims.require_employee_id()?;

    let request = service.create(employee_id, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn get_requests(
    claims: Claims,
    service: web::Data<LeaveService>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Read)?;

    let requests = if claims.is_hr() {
        service.list_all().await?
    } else {
        service.list_for_employee(claims.require_employee_id()?).await?
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn get_request(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Read)?;

    let request = service
        .find(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

    if !claims.is_hr() && !claims.owns(request.employee_id) {
        return Err(AppError::Forbidden(
            "Can only view your own leave requests".to_string(),
        ));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn approve_request(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Approve)?;

    let request = service.approve(path.into_inner(), &claims).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn reject_request(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Reject)?;

    let request = service.reject(path.into_inner(), &claims).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel_request(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveRequest, Action::Cancel)?;

    let request = service.cancel(path.into_inner(), &claims).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn get_balance(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    authorize(claims.role, Resource::LeaveBalance, Action::Read)?;
    let employee_id = path.into_inner();

    if !claims.is_hr() && !claims.owns(employee_id) {
        return Err(AppError::Forbidden(
            "Can only view your own leave balance".to_string(),
        ));
    }

    let balance = service.balance(employee_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(balance)))
}
