use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use hrcore::Config;
use hrcore::database::{
    init_database,
    repositories::{
        AttendanceRepository, EmployeeRepository, LeaveRepository, PayrollRepository, PgTaskQueue,
    },
};
use hrcore::routes;
use hrcore::scheduler::{Worker, register_recurring_jobs};
use hrcore::services::{AttendanceService, EmployeeService, LeaveService, PayrollService};

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("Configuration loaded (environment: {})", config.environment);

    let pool = init_database(&config.database_url).await?;
    log::info!("Database initialized");

    let employee_repository = EmployeeRepository::new(pool.clone());
    let attendance_repository = AttendanceRepository::new(pool.clone());
    let leave_repository = LeaveRepository::new(pool.clone());
    let payroll_repository = PayrollRepository::new(pool.clone());
    let task_queue = PgTaskQueue::new(pool.clone());

    let settings = config.company.clone();
    let attendance_service = AttendanceService::new(
        attendance_repository.clone(),
        employee_repository.clone(),
        leave_repository.clone(),
        settings.clone(),
    );
    let leave_service = LeaveService::new(pool.clone(), leave_repository.clone(), settings.clone());
    let payroll_service = PayrollService::new(
        pool.clone(),
        employee_repository.clone(),
        attendance_repository.clone(),
        leave_repository.clone(),
        payroll_repository.clone(),
        settings.clone(),
    );
    let employee_service = EmployeeService::new(
        pool.clone(),
        employee_repository.clone(),
        leave_repository.clone(),
        settings.clone(),
    );

    register_recurring_jobs(&task_queue).await?;
    Worker::new(
        task_queue.clone(),
        attendance_service.clone(),
        payroll_service.clone(),
        employee_repository.clone(),
        payroll_repository.clone(),
    )
    .spawn();
    log::info!("Scheduler worker spawned");

    let config_data = web::Data::new(config.clone());
    let employee_repo_data = web::Data::new(employee_repository);
    let task_queue_data = web::Data::new(task_queue);
    let attendance_service_data = web::Data::new(attendance_service);
    let leave_service_data = web::Data::new(leave_service);
    let payroll_service_data = web::Data::new(payroll_service);
    let employee_service_data = web::Data::new(employee_service);

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(employee_repo_data.clone())
            .app_data(task_queue_data.clone())
            .app_data(attendance_service_data.clone())
            .app_data(leave_service_data.clone())
            .app_data(payroll_service_data.clone())
            .app_data(employee_service_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health)
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
