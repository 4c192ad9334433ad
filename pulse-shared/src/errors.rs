use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// E7xxx is reserved for analytics task errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    JobNotFound,
    JobAlreadyRunning,
    StatsUnavailable,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::JobNotFound => "E7001",
            Self::JobAlreadyRunning => "E7002",
            Self::StatsUnavailable => "E7003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::JobNotFound => StatusCode::NOT_FOUND,
            Self::JobAlreadyRunning => StatusCode::CONFLICT,
            Self::StatsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse::new(self.code.code(), self.message);
        (self.code.status_code(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
