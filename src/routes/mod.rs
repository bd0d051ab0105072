use actix_web::web;

pub mod attendance;
pub mod employees;
pub mod leave;
pub mod payroll;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(attendance::configure)
            .configure(leave::configure)
            .configure(payroll::configure)
            .configure(employees::configure),
    );
}
