use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::game::GameSessionController;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<GameSessionController>,
}

impl AppState {
    pub fn new(controller: Arc<GameSessionController>) -> Self {
        Self { controller }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Insufficient tokens: need {required}, have {available}")]
    InsufficientTokens { required: i64, available: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Transient failures the player can simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Upstream(_) | AppError::Timeout(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let transient = self.is_transient();
        let (status, error_message) = match self {
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg),
            AppError::InsufficientTokens {
                required,
                available,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                format!("Need {} tokens, have {}", required, available),
            ),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "retryable": transient,
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = vec![
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::InsufficientTokens {
                    required: 10,
                    available: 5,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (AppError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                AppError::DatabaseError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn only_network_failures_are_transient() {
        assert!(AppError::Upstream("down".into()).is_transient());
        assert!(AppError::Timeout("slow".into()).is_transient());
        assert!(!AppError::Validation("bad".into()).is_transient());
        assert!(!AppError::DatabaseError("io".into()).is_transient());
    }
}
