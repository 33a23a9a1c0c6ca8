//! # API Route Modules
//!
//! - `users` — registration, lookup and token deposits.
//! - `properties` — property creation, reads, detail updates and deletion.
//! - `transfers` — share transfers between holders of a property, with
//!   ownership following the majority holder.

pub mod properties;
pub mod transfers;
pub mod users;

use deedshare_core::{Username, ValidationError};

use crate::error::AppError;
use crate::state::AppState;

/// Fail with a validation error naming `role` if `username` is not registered.
pub(crate) fn ensure_registered(
    state: &AppState,
    username: &Username,
    role: &'static str,
) -> Result<(), AppError> {
    if state.users.contains(username.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnregisteredUser {
            role,
            username: username.to_string(),
        }
        .into())
    }
}
