use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::allocator::AllocateError;
use crate::api::handlers::FailureResponse;
use crate::storage::StorageError;

/// Failures surfaced by the URL service, one variant per status class
#[derive(Debug, Error)]
pub enum AppError {
    #[error("short id already exists")]
    Conflict,
    #[error("id not found")]
    NotFound,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("no free short id after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::NOT_ACCEPTABLE,
            AppError::Exhausted { .. } | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => AppError::Conflict,
            StorageError::Other(err) => AppError::Storage(err),
        }
    }
}

impl From<AllocateError> for AppError {
    fn from(err: AllocateError) -> Self {
        match err {
            AllocateError::Exhausted { attempts } => AppError::Exhausted { attempts },
            AllocateError::Storage(err) => AppError::Storage(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(FailureResponse::new(self.to_string()))).into_response()
    }
}
