//! Error handling module for the QR backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const REFERENCE_NOT_FOUND: &str = "REFERENCE_NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const IMAGE_GENERATION_ERROR: &str = "IMAGE_GENERATION_ERROR";
    pub const CHILD_CREATION_ERROR: &str = "CHILD_CREATION_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// One or more input fields failed validation
    Validation(Vec<String>),
    /// Malformed request body
    BadRequest(String),
    /// Duplicate name or key
    Conflict(String),
    /// Location or category id does not resolve
    ReferenceNotFound(String),
    /// Read path miss
    NotFound(String),
    /// Rendering or uploading the QR image failed
    ImageGeneration(String),
    /// Creating a Link, Image or Document failed
    ChildCreation(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error with a single message.
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ReferenceNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ImageGeneration(_)
            | AppError::ChildCreation(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::ReferenceNotFound(_) => codes::REFERENCE_NOT_FOUND,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::ImageGeneration(_) => codes::IMAGE_GENERATION_ERROR,
            AppError::ChildCreation(_) => codes::CHILD_CREATION_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(errors) => errors.join("; "),
            AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::ReferenceNotFound(msg)
            | AppError::NotFound(msg)
            | AppError::ImageGeneration(msg)
            | AppError::ChildCreation(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // The UNIQUE indexes are the real backstop for racing creations.
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                tracing::warn!("Unique constraint violated: {}", db_err.message());
                return AppError::Conflict(format!("Duplicate record: {}", db_err.message()));
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Background task failed: {:?}", err);
        AppError::Internal(format!("Task failed: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::Validation(errors) => Some(serde_json::json!({ "errors": errors })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("name is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ReferenceNotFound("loc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ImageGeneration("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ChildCreation("boom".into()).error_code(),
            codes::CHILD_CREATION_ERROR
        );
    }

    #[test]
    fn test_validation_envelope_lists_every_error() {
        let err = AppError::Validation(vec!["a".into(), "b".into()]);
        let body = ErrorResponse::new(&err);
        assert!(!body.success);
        assert_eq!(body.error.message, "a; b");
        assert_eq!(
            body.error.details,
            Some(serde_json::json!({ "errors": ["a", "b"] }))
        );
    }
}
