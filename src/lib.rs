pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod scheduler;
pub mod services;

pub use config::{CompanySettings, Config};
pub use error::AppError;
