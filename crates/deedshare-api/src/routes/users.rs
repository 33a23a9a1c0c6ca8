//! # Users API
//!
//! Registration, lookup and wallet deposits. Responses never carry the
//! password.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use deedshare_core::{DomainError, Email, Password, TokenAmount, Tokens, User, Username};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, required, Validate};
use crate::state::AppState;

/// Registration request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for RegisterUserRequest {
    type Valid = User;

    fn validate(self) -> Result<User, deedshare_core::ValidationError> {
        let username = Username::new(required(self.username, "username")?)?;
        let email = Email::new(required(self.email, "email")?)?;
        let password = Password::new(required(self.password, "password")?)?;
        Ok(User::register(username, email, password))
    }
}

/// Deposit request. `amount` is a JSON number or a numeric string, whole or
/// fractional, with at most six decimal places.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositRequest {
    pub username: Option<String>,
    #[schema(value_type = Object)]
    pub amount: Option<serde_json::Value>,
}

impl Validate for DepositRequest {
    type Valid = (Username, TokenAmount);

    fn validate(self) -> Result<Self::Valid, deedshare_core::ValidationError> {
        let username = Username::new(required(self.username, "username")?)?;
        let amount = TokenAmount::from_json(self.amount.as_ref())?;
        Ok((username, amount))
    }
}

/// User as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    #[schema(value_type = f64)]
    pub wallet_tokens: Tokens,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username().to_string(),
            email: user.email().to_string(),
            wallet_tokens: user.wallet_tokens(),
        }
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/deposit", post(deposit))
        .route("/users/:username", get(get_user))
}

/// POST /users — Register a new user.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid input, username taken or email in use", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn register_user(
    State(state): State<AppState>,
    body: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let user = extract_validated_json(body)?;

    let user = state.users.try_insert(user.username().as_str(), user.clone(), |table| {
        user.ensure_unique(table.values()).map_err(AppError::from)
    })?;

    tracing::info!(username = %user.username(), "user registered");
    Ok(Json(UserResponse::from(&user)))
}

/// GET /users/:username — Look up a user.
#[utoipa::path(
    get,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .users
        .get(&username)
        .map(|user| Json(UserResponse::from(&user)))
        .ok_or_else(|| DomainError::user_not_found(username).into())
}

/// POST /users/deposit — Add tokens to a user's wallet.
#[utoipa::path(
    post,
    path = "/users/deposit",
    request_body = DepositRequest,
    responses(
        (status = 200, description = "Balance updated", body = UserResponse),
        (status = 400, description = "Amount missing, non-numeric or not positive", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn deposit(
    State(state): State<AppState>,
    body: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let (username, amount) = extract_validated_json(body)?;

    let user = state
        .users
        .try_update(username.as_str(), |user| {
            user.deposit(amount)?;
            Ok::<_, AppError>(user.clone())
        })
        .ok_or_else(|| AppError::from(DomainError::user_not_found(username.as_str())))??;

    tracing::info!(
        username = %username,
        amount = %amount,
        balance = %user.wallet_tokens(),
        "deposit applied"
    );
    Ok(Json(UserResponse::from(&user)))
}
