//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`ServiceError`] and transport-level failures to HTTP status
//! codes and a uniform JSON envelope. Internal failures (storage,
//! cryptography) are logged with their cause and returned to the client
//! with no detail at all.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use agora_core::ValidationError;
use agora_service::ServiceError;
use agora_store::StoreError;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface. The
/// `details` field carries additional context for 422 validation errors
/// and is omitted otherwise.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for
/// Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request content failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    ///
    /// Normalized with `Validation` to 422 Unprocessable Entity: the
    /// client sent syntactically valid HTTP but semantically invalid
    /// content. Only malformed HTTP framing is 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure, missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure, insufficient role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but never
    /// returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable error code for this
    /// error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Conflict(_) => tracing::warn!(error = %self, "request conflict"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(inner) => Self::Validation(inner.to_string()),
            ServiceError::NotFound(_) => Self::NotFound(err.to_string()),
            ServiceError::IssuanceConflict => Self::Conflict(err.to_string()),
            // An empty finalize is a content problem the caller can fix,
            // same bucket as validation.
            ServiceError::NoContributions => Self::Validation(err.to_string()),
            ServiceError::Crypto(inner) => Self::Internal(inner.to_string()),
            ServiceError::Store(inner) => Self::from(inner),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // Duplicate-key conflicts are handled inside the services;
            // one leaking here still maps to its honest status.
            StoreError::DuplicateIdentityDigest | StoreError::DuplicateProtocolNumber => {
                Self::Conflict(err.to_string())
            }
            StoreError::Corrupt { .. } | StoreError::Database(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (
                AppError::BadRequest("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "BAD_REQUEST",
            ),
            (
                AppError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("pg connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn into_response_validation_keeps_message() {
        let (status, body) =
            response_parts(AppError::Validation("display_name too short".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.message.contains("display_name"));
    }

    #[test]
    fn service_errors_map_to_the_taxonomy() {
        let validation: AppError = ServiceError::Validation(ValidationError::InvalidRegion(
            "XX".into(),
        ))
        .into();
        assert!(matches!(validation, AppError::Validation(_)));

        let not_found: AppError = ServiceError::NotFound("identity").into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let conflict: AppError = ServiceError::IssuanceConflict.into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let empty: AppError = ServiceError::NoContributions.into();
        assert!(matches!(empty, AppError::Validation(_)));

        let corrupt: AppError =
            ServiceError::Store(StoreError::corrupt("identity", "bad row")).into();
        assert!(matches!(corrupt, AppError::Internal(_)));
    }
}
