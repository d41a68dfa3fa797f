use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the line optimizer before any runtime state is touched.
#[derive(Debug, Error, PartialEq)]
pub enum OptimizeError {
    #[error("no capacity rows supplied")]
    EmptyInput,

    #[error("row {row}: {reason}")]
    InvalidInput { row: usize, reason: String },

    #[error("line balancing needs at least 2 process steps, got {steps}")]
    DegenerateInput { steps: usize },

    #[error("process step {step_id} has no machines")]
    InvariantViolation { step_id: i64 },
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OptimizeError> for AppError {
    fn from(err: OptimizeError) -> Self {
        match err {
            OptimizeError::EmptyInput | OptimizeError::InvalidInput { .. } => {
                AppError::Validation(err.to_string())
            }
            OptimizeError::DegenerateInput { .. } => AppError::UnprocessableEntity(err.to_string()),
            OptimizeError::InvariantViolation { .. } => AppError::Invariant(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Invariant(msg) => {
                tracing::error!("Invariant violation: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVARIANT_VIOLATION",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
