//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers.
//!
//! Request DTOs declare their fields as `Option` so that an absent field is
//! reported by name as a validation error instead of an opaque
//! deserialization failure.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use deedshare_core::ValidationError;

use crate::error::AppError;

/// Request types that turn into a validated command.
pub trait Validate {
    /// The checked form handlers work with.
    type Valid;

    /// Check every business rule that does not need stored state.
    fn validate(self) -> Result<Self::Valid, ValidationError>;
}

/// Unwrap a required request field.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    let value = extract_json(result)?;
    Ok(value.validate()?)
}
