//! Structured error handling for the add-ons service.
//!
//! Provides type-safe error handling with automatic conversion to HTTP responses.
//! Internal details are logged but never exposed to clients.

use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application error type with automatic response conversion.
///
/// Internal details are logged but sanitized messages are sent to clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// User-facing validation failure (wrong input the user can correct).
    #[error("{0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal: {0}")]
    Internal(String),
}

/// Result type alias for the add-ons crates.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a not found error for an entity.
    pub fn not_found(entity: &str, id: impl Display) -> Self {
        Self::NotFound(format!("{entity} not found: {id}"))
    }

    /// Create a user-facing validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Fully qualified exception type path of this error.
    ///
    /// Variants are nested under the enum path, so suppressing
    /// `addons_core::error::AppError` in the error forwarder covers all of them.
    #[must_use]
    pub const fn exception_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "addons_core::error::AppError::NotFound",
            Self::Unauthenticated(_) => "addons_core::error::AppError::Unauthenticated",
            Self::PermissionDenied(_) => "addons_core::error::AppError::PermissionDenied",
            Self::InvalidArgument(_) => "addons_core::error::AppError::InvalidArgument",
            Self::Validation(_) => "addons_core::error::AppError::Validation",
            Self::Conflict(_) => "addons_core::error::AppError::Conflict",
            Self::Unavailable(_) => "addons_core::error::AppError::Unavailable",
            Self::Internal(_) => "addons_core::error::AppError::Internal",
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let exception_type = self.exception_type();

        let message = match &self {
            Self::NotFound(msg)
            | Self::Unauthenticated(msg)
            | Self::PermissionDenied(msg)
            | Self::InvalidArgument(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Validation(msg) => {
                warn!(exception_type, error = %msg, "Validation failed");
                msg.clone()
            }
            Self::Unavailable(msg) => {
                error!(exception_type, error = %msg, "Service unavailable");
                "Service unavailable".to_string()
            }
            Self::Internal(msg) => {
                error!(exception_type, error = %msg, "Internal error");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
