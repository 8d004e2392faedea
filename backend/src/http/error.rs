//! HTTP error handling and response types.
//!
//! `/v1` endpoints answer with [`ApiError`] bodies. The server-side functions
//! under `/functions` keep their own flat bodies (`{"error": ...}`, and
//! `{"success": false, "error": ...}` for broadcasts).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::repository::RepositoryError;
use crate::services::{BroadcastError, DeletionError, ExtractionError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or unresolvable credential
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => {
                let details = e.context().to_string();
                match e {
                    RepositoryError::NotFound { message, .. } => (
                        StatusCode::NOT_FOUND,
                        ApiError::new("NOT_FOUND", message).with_details(details),
                    ),
                    RepositoryError::ValidationError { message, .. } => (
                        StatusCode::BAD_REQUEST,
                        ApiError::new("BAD_REQUEST", message).with_details(details),
                    ),
                    RepositoryError::TimeoutError { message, .. } => (
                        StatusCode::GATEWAY_TIMEOUT,
                        ApiError::new("TIMEOUT", message).with_details(details),
                    ),
                    other => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("REPOSITORY_ERROR", other.to_string()),
                    ),
                }
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// `{"error": message}` with `status`.
pub fn function_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for DeletionError {
    fn into_response(self) -> Response {
        let status = match self {
            DeletionError::Unauthorized => StatusCode::UNAUTHORIZED,
            DeletionError::Forbidden => StatusCode::FORBIDDEN,
            DeletionError::MissingTarget | DeletionError::SelfDeletion => StatusCode::BAD_REQUEST,
            DeletionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        function_error(status, self.to_string())
    }
}

impl IntoResponse for BroadcastError {
    fn into_response(self) -> Response {
        let status = match self {
            BroadcastError::MissingId => StatusCode::BAD_REQUEST,
            BroadcastError::NotFound => StatusCode::NOT_FOUND,
            BroadcastError::AlreadySending => StatusCode::CONFLICT,
            BroadcastError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        let status = match self {
            ExtractionError::MissingImage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        function_error(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_repository_errors_map_to_status() {
        let not_found = AppError::from(RepositoryError::not_found("classroom not found"));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = AppError::from(RepositoryError::validation_with_context(
            "name is required",
            ErrorContext::new("create_classroom"),
        ));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let query = AppError::from(RepositoryError::query("boom"));
        assert_eq!(
            query.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_function_errors_map_to_status() {
        assert_eq!(
            DeletionError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            BroadcastError::AlreadySending.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ExtractionError::MissingImage.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
