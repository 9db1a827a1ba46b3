//! Error taxonomy surfaced at the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::plans::generator::GenerationError;
use crate::readings::validator::ValidationError;
use crate::sensor::SensorUnavailable;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Sensor(#[from] SensorUnavailable),

    #[error("a meal plan is already being generated for this session")]
    Busy,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, details) = match &self {
            AppError::Validation(errs) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "input failed validation".to_string(),
                errs.iter().map(ToString::to_string).collect(),
            ),
            AppError::Generation(e) => {
                tracing::warn!(error = %e, "generation failed");
                (StatusCode::BAD_GATEWAY, "generation_error", e.to_string(), vec![])
            }
            AppError::Sensor(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "sensor_unavailable",
                e.to_string(),
                vec![],
            ),
            AppError::Busy => (StatusCode::CONFLICT, "busy", self.to_string(), vec![]),
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, "not_found", what.clone(), vec![])
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "the record store failed, please retry".into(),
                    vec![],
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".into(),
                    vec![],
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error,
                message,
                details,
            }),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
