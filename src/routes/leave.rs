use actix_web::web;

use crate::handlers::leave;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            .route("", web::post().to(leave::create_request))
            .route("", web::get().to(leave::get_requests))
            .route("/balance/{employee_id}", web::get().to(leave::get_balance))
            .route("/{id}", web::get().to(leave::get_request))
            .route("/{id}/approve", web::post().to(leave::approve_request))
            .route("/{id}/reject", web::post().to(leave::reject_request))
            .route("/{id}/cancel", web::post().to(leave::cancel_request)),
    );
}
