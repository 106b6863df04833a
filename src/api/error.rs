use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;
use tracing::error;

use crate::storage::StoreError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn with_status(status: StatusCode, message: &str) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// Request failures; clients only ever see a generic message
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("missing or invalid admin API key")]
    Unauthorized,
    #[error("visit task did not complete: {0}")]
    Task(tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(e) => {
                error!(error = %e, "DB Error");
                ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, "DB Error")
            }
            ApiError::Unauthorized => {
                ErrorResponse::with_status(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            ApiError::Task(e) => {
                error!(error = %e, "Server error");
                ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        }
    }
}

/// Response for a handler that panicked
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Server error");

    ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
}
