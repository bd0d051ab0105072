use actix_web::web;

use crate::handlers::employees;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employees")
            .route("", web::post().to(employees::onboard))
            .route("", web::get().to(employees::get_employees))
            .route("/{id}", web::get().to(employees::get_employee))
            .route(
                "/{id}/payment-profile",
                web::get().to(employees::get_payment_profile),
            )
            .route(
                "/{id}/payment-profile",
                web::put().to(employees::update_payment_profile),
            ),
    );
}
