//! Error types for Muster

use hyper::StatusCode;

/// Main error type for Muster operations
#[derive(Debug, thiserror::Error)]
pub enum MusterError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {field} {reason}")]
    Validation { field: String, reason: String },

    #[error("Duplicate: {0}")]
    Conflict(String),

    #[error("Reference not found: {0}")]
    Reference(String),

    #[error("Not Found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MusterError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, reason: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Reference(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Reference(_) => "REFERENCE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Database(_) => "DB_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for MusterError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for MusterError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for MusterError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<bson::ser::Error> for MusterError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON error: {}", err))
    }
}

impl From<bson::de::Error> for MusterError {
    fn from(err: bson::de::Error) -> Self {
        Self::Internal(format!("BSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for MusterError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        // Unique index violations surface as duplicate key write errors
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == 11000 =>
            {
                Self::Conflict(write_error.message.clone())
            }
            ErrorKind::Command(command_error) if command_error.code == 11000 => {
                Self::Conflict(command_error.message.clone())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Result type alias for Muster operations
pub type Result<T> = std::result::Result<T, MusterError>;
