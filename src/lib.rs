pub mod access;
pub mod accounts;
pub mod auth;
pub mod configuration;
pub mod core;
pub mod database;
pub mod phone;
pub mod telegram;
pub mod verification;
pub mod web;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config Error:{0}")]
    ConfigError(String),

    #[error("Service error")]
    ServiceError,
}
