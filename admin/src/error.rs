//! Error types for admin handlers.
//!
//! Bridges [`readmodel_engine::RegistryError`] onto HTTP responses,
//! implementing Axum's `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use readmodel_engine::RegistryError;
use serde::Serialize;
use std::fmt;

/// Admin API error.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl AppError {
    /// Build an error with an explicit status, message, and machine-readable code.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotRegistered(_) => {
                Self::new(StatusCode::NOT_FOUND, err.to_string(), "NOT_REGISTERED")
            }
            RegistryError::AlreadyRegistered(_) => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "ALREADY_REGISTERED")
            }
            RegistryError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "INVALID_TRANSITION")
            }
            RegistryError::Lock(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string(), "LOCK_ERROR")
            }
            RegistryError::LogReader(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "LOG_READER_ERROR",
            ),
            RegistryError::StateTracker(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "STATE_TRACKER_ERROR",
            ),
            RegistryError::FailedEventLedger(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "FAILED_EVENT_LEDGER_ERROR",
            ),
            RegistryError::Database(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "DATABASE_ERROR",
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, message = %self.message, "admin request failed");
        }
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_registered_maps_to_404() {
        let err: AppError = RegistryError::NotRegistered("sessions".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_REGISTERED");
    }

    #[test]
    fn already_registered_maps_to_409() {
        let err: AppError = RegistryError::AlreadyRegistered("sessions".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
