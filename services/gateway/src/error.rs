use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use matching_engine::{CancelError, PlaceError};
use serde_json::json;
use thiserror::Error;
use types::errors::ValidationError;

/// Central error type for the gateway
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unfillable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PlaceError> for AppError {
    fn from(err: PlaceError) -> Self {
        let msg = err.to_string();
        match err {
            PlaceError::Validation(_) => AppError::Validation(msg),
            PlaceError::MarketUnfillable => AppError::Unfillable(msg),
            PlaceError::Storage(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<CancelError> for AppError {
    fn from(err: CancelError) -> Self {
        let msg = err.to_string();
        match err {
            CancelError::NotFound(id) => AppError::NotFound(format!("order {}", id)),
            CancelError::AlreadyTerminal { .. } => AppError::Conflict(msg),
            CancelError::Storage(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION"),
            AppError::Unfillable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg, "MARKET_UNFILLABLE")
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "ORDER_TERMINAL"),
            AppError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}
