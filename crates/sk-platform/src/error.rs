//! Platform Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sk_docstore::DocStoreError;
use thiserror::Error;
use tracing::error;

use crate::api::common::ApiError;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate entity: {entity_type} with {field}={value}")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error(transparent)]
    DocStore(#[from] DocStoreError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// HTTP status and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::InvalidToken { .. } => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::DocStore(DocStoreError::StoreUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            Self::DocStore(DocStoreError::OperationFailed { .. }) => (StatusCode::CONFLICT, "OPERATION_FAILED"),
            Self::DocStore(DocStoreError::AmbiguousResult { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AMBIGUOUS_RESULT")
            }
            Self::DocStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATA_ERROR"),
            Self::Configuration { .. } | Self::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(code, error = %self, "request failed");
        }

        let body = ApiError {
            error: code.to_string(),
            message: self.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PlatformError::InvalidCredentials.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PlatformError::forbidden("x").status_and_code().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PlatformError::from(DocStoreError::unavailable("down")).status_and_code(),
            (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
        );
        assert_eq!(
            PlatformError::from(DocStoreError::ambiguous("User", 2)).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "AMBIGUOUS_RESULT")
        );
        assert_eq!(
            PlatformError::from(DocStoreError::operation_failed("E11000")).status_and_code().0,
            StatusCode::CONFLICT
        );
    }
}
