use crate::db::error::DbError;
use crate::models::types::Username;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid environment: {0}")]
    Env(#[source] ConfigErrorKind),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a connection attempt is turned away. Fatal to that attempt only.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("username header is required")]
    EmptyUsername,

    #[error("user already connected")]
    AlreadyConnected,

    #[error("upgrade error: {0}")]
    UpgradeFailed(String),
}

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdmissionError::EmptyUsername => StatusCode::BAD_REQUEST,
            AdmissionError::AlreadyConnected => StatusCode::CONFLICT,
            AdmissionError::UpgradeFailed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("username {0} is already registered")]
    AlreadyPresent(Username),
}

/// Per-message routing failures. A session logs these and keeps reading.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cannot encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("user {0} is offline")]
    RecipientOffline(Username),

    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: Username, reason: String },
}
