//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from deedshare-core and store errors to HTTP status
//! codes with a flat JSON body `{"error": "<message>", "code": "<CODE>"}`.
//! Never exposes internal error details in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deedshare_core::{DomainError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::StoreError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code (e.g., "NOT_FOUND", "INSUFFICIENT_SHARES").
    pub code: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Every client-input class of error is a 400; only missing records are 404.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// A field failed validation (400).
    #[error("{0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("malformed request body: {0}")]
    BadRequest(String),

    /// Username or email already registered (400).
    #[error("{0}")]
    Conflict(String),

    /// Caller may not perform the operation on this record (400).
    #[error("{0}")]
    Forbidden(String),

    /// Transfer exceeds the source holder's shares (400).
    #[error("{0}")]
    InsufficientShares(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::BAD_REQUEST, "CONFLICT"),
            Self::Forbidden(_) => (StatusCode::BAD_REQUEST, "FORBIDDEN"),
            Self::InsufficientShares(_) => (StatusCode::BAD_REQUEST, "INSUFFICIENT_SHARES"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
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

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        } else {
            tracing::debug!(code, error = %message, "request rejected");
        }

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::Validation(_) => Self::Validation(message),
            DomainError::NotFound { .. } => Self::NotFound(message),
            DomainError::UsernameTaken(_) | DomainError::EmailInUse(_) => Self::Conflict(message),
            DomainError::DeleteForbidden { .. } => Self::Forbidden(message),
            DomainError::InsufficientShares { .. } => Self::InsufficientShares(message),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        DomainError::from(err).into()
    }
}

/// Snapshot failures surface as 500s; the detail goes to the log only.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deedshare_core::ForbiddenReason;

    #[test]
    fn client_errors_are_400() {
        for err in [
            AppError::Validation("v".into()),
            AppError::BadRequest("b".into()),
            AppError::Conflict("c".into()),
            AppError::Forbidden("f".into()),
            AppError::InsufficientShares("i".into()),
        ] {
            assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST, "{err:?}");
        }
    }

    #[test]
    fn codes_per_variant() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Conflict("x".into()), StatusCode::BAD_REQUEST, "CONFLICT"),
            (AppError::Forbidden("x".into()), StatusCode::BAD_REQUEST, "FORBIDDEN"),
            (
                AppError::InsufficientShares("x".into()),
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_SHARES",
            ),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
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

    #[test]
    fn domain_errors_map_to_variants() {
        let err = AppError::from(DomainError::property_not_found("p-1"));
        assert!(matches!(err, AppError::NotFound(ref m) if m == "property p-1 not found"));

        let err = AppError::from(DomainError::UsernameTaken("alice".into()));
        assert!(matches!(err, AppError::Conflict(_)));

        let err = AppError::from(DomainError::EmailInUse("a@b".into()));
        assert!(matches!(err, AppError::Conflict(_)));

        let err = AppError::from(DomainError::DeleteForbidden {
            property_id: "p-1".into(),
            caller: "bob".into(),
            reason: ForbiddenReason::NotOwner {
                owner: "alice".into(),
            },
        });
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = AppError::from(DomainError::InsufficientShares {
            holder: "alice".into(),
            held: 1,
            requested: 2,
        });
        assert!(matches!(err, AppError::InsufficientShares(_)));
    }

    #[test]
    fn validation_error_keeps_field_name() {
        let err = AppError::from(ValidationError::MissingField("deedURL"));
        match err {
            AppError::Validation(msg) => assert!(msg.contains("deedURL"), "got: {msg}"),
            other => panic!("expected Validation, got: {other:?}"),
        }
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_is_flat_error_and_code() {
        let (status, body) =
            response_parts(AppError::InsufficientShares("alice holds 40".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INSUFFICIENT_SHARES");
        assert_eq!(body.error, "alice holds 40");
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) = response_parts(AppError::NotFound("property p not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
        assert!(body.error.contains("property p"));
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("disk full at /var/lib".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(
            !body.error.contains("disk full"),
            "internal error details must not leak: {}",
            body.error
        );
        assert_eq!(body.error, "An internal error occurred");
    }
}
