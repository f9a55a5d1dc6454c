//! Application-wide error types.

use thiserror::Error;

use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("state error: {0}")]
    State(String),

    #[error("dialog error: {0}")]
    Dialog(String),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
