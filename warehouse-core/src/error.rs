use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Domain-level error taxonomy. Separate from `warehouse_shared::Error`,
/// which carries ambient/infrastructure failures — a `sqlx::Error` that
/// reaches a handler is wrapped into `Integrity`/`Configuration` rather than
/// propagated directly, so callers only ever see this enum at the wire.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

impl DomainError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        DomainError::NotFound { entity, id }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            DomainError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DomainError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidArgument(_) => "invalid_argument",
            DomainError::NotFound { .. } => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::PreconditionFailed(_) => "precondition_failed",
            DomainError::Integrity(_) => "integrity_error",
            DomainError::Configuration(_) => "configuration_error",
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Integrity(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct DomainErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "domain error");
        } else {
            tracing::warn!(error = %self, "domain error");
        }
        let body = DomainErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
