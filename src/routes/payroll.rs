use actix_web::web;

use crate::handlers::payroll;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payroll")
            .route("/periods", web::post().to(payroll::create_period))
            .route("/periods", web::get().to(payroll::get_periods))
            .route(
                "/periods/{id}/compute",
                web::post().to(payroll::compute_period),
            )
            .route("/periods/{id}/close", web::post().to(payroll::close_period))
            .route(
                "/periods/{id}/records",
                web::get().to(payroll::get_period_records),
            )
            .route("/records", web::get().to(payroll::get_my_records))
            .route(
                "/records/{id}/payslip",
                web::post().to(payroll::generate_payslip),
            ),
    );
}
