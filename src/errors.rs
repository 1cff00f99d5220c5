use crate::services::storage_service::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Map storage errors onto HTTP statuses: 404 for missing objects, 400 for
/// malformed key segments, 500 for everything else (backend failures
/// propagate unmodified as their message).
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::ObjectNotFound { .. } => AppError::not_found(err.to_string()),
            StorageError::InvalidSegment { .. } => AppError::bad_request(err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        let not_found = AppError::from(StorageError::ObjectNotFound {
            key: "d/s/f.png".into(),
        });
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let invalid = AppError::from(StorageError::InvalidSegment {
            field: "date",
            reason: "must not be empty".into(),
        });
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let backend = AppError::from(StorageError::UploadFailed("connection reset".into()));
        assert_eq!(backend.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_carries_status() {
        let response = AppError::not_found("object `x` not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
