//! API error type
//!
//! Every error is rendered as the failure envelope with a matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::{FieldError, ValidationResult};
use fleet_protocol::{ApiResponse, ProtocolError};
use session_auth::AuthError;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Handler result carrying the success envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Insufficient permissions".to_string())
    }

    /// `Ok` for a passing validation, otherwise a 400 with field errors
    pub fn check(result: ValidationResult) -> Result<(), ApiError> {
        result.into_result().map_err(|errors| ApiError::Validation {
            message: "Invalid request data".to_string(),
            errors,
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(detail) = &self {
            error!(%detail, "Request failed");
        }

        let body = match self {
            ApiError::Validation { message, errors } => {
                ApiResponse::<()>::failure(message).with_errors(errors)
            }
            other => ApiResponse::<()>::failure(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, .. } => {
                ApiError::NotFound(format!("{} not found", capitalize(entity)))
            }
            StorageError::Conflict(msg) => ApiError::BadRequest(msg),
            StorageError::Lock(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::OrganizationNotFound => ApiError::BadRequest(err.to_string()),
            AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::WrongTokenKind
            | AuthError::Disabled => ApiError::Unauthorized(err.to_string()),
            AuthError::Key(msg) => ApiError::Internal(msg),
            AuthError::Storage(e) => e.into(),
        }
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::OrganizationNotFound).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::forbidden().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::from(StorageError::NotFound {
            entity: "vehicle",
            id: "v9".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Vehicle not found");
    }

    #[test]
    fn test_internal_detail_hidden() {
        let err = ApiError::Internal("poisoned lock".to_string());
        assert_eq!(err.to_string(), "Internal server error");
    }
}
