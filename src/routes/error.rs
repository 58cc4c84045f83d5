use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::core::EngineError;
use crate::models::ErrorResponse;

/// Everything a handler can fail with, mapped to an HTTP status
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Validation(String),

    #[error("failed to render response: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Engine(EngineError::InvalidTransition { .. }) => "invalid_transition",
            ApiError::Engine(EngineError::TerminalStateViolation { .. }) => "terminal_state",
            ApiError::Engine(EngineError::Conflict(_)) => "conflict",
            ApiError::Engine(EngineError::NotFound { .. }) => "not_found",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Render(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::InvalidTransition { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Engine(EngineError::TerminalStateViolation { .. }) => StatusCode::CONFLICT,
            ApiError::Engine(EngineError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Engine(EngineError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
