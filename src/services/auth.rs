use actix_web::{
    Error as ActixError, FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized,
    web::Data,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::Role;
use crate::error::AppError;

/// Authenticated actor supplied by the external identity service. The core
/// trusts this token for authorization decisions; issuance and sessions are
/// not handled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id at the identity service
    pub email: String,
    pub role: Role,
    pub employee_id: Option<Uuid>, // exactly one for employee-role actors
    pub exp: usize,
}

impl Claims {
    pub fn is_hr(&self) -> bool {
        self.role == Role::Hr
    }

    /// The employee record this actor is linked to, required for
    /// self-service operations.
    pub fn require_employee_id(&self) -> Result<Uuid, AppError> {
        self.employee_id
            .ok_or_else(|| AppError::BadRequest("Employee profile missing".to_string()))
    }

    /// Whether the actor owns rows belonging to `employee_id`.
    pub fn owns(&self, employee_id: Uuid) -> bool {
        self.employee_id == Some(employee_id)
    }
}

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        if let Some(auth_header) = auth_header {
            if let Ok(auth_str) = auth_header.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    if let Some(config) = req.app_data::<Data<Config>>() {
                        match decode::<Claims>(
                            token,
                            &DecodingKey::from_secret(config.jwt_secret.as_ref()),
                            &Validation::new(Algorithm::HS256),
                        ) {
                            Ok(token_data) => {
                                return ready(Ok(token_data.claims));
                            }
                            Err(_) => {
                                return ready(Err(ErrorUnauthorized("Invalid token")));
                            }
                        }
                    }
                }
            }
        }

        ready(Err(ErrorUnauthorized(
            "Missing or invalid authorization header",
        )))
    }
}
