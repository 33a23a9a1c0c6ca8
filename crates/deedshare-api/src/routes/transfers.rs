//! # Share Transfers API
//!
//! `POST /transfer/:id` moves shares between two holders of a property.
//!
//! Checks run in this order: request fields (positive `shares`, non-empty
//! and distinct `from`/`to`), `to` is a registered user, the property exists,
//! `from` holds enough shares. The ledger update, history entry, owner
//! recomputation and write-back all happen under the property table's
//! write lock, so concurrent transfers on one property serialize.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use deedshare_core::{DomainError, Username, ValidationError};
use serde::Deserialize;
use utoipa::ToSchema;

use super::ensure_registered;
use super::properties::{parse_property_id, PropertyResponse};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, required, Validate};
use crate::state::AppState;

/// Transfer request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferSharesRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub shares: Option<u64>,
}

/// Validated transfer command.
#[derive(Debug, PartialEq, Eq)]
pub struct TransferShares {
    pub from: Username,
    pub to: Username,
    pub shares: u64,
}

impl Validate for TransferSharesRequest {
    type Valid = TransferShares;

    fn validate(self) -> Result<TransferShares, ValidationError> {
        let shares = required(self.shares, "shares")?;
        if shares == 0 {
            return Err(ValidationError::ZeroShares("shares"));
        }
        let from = Username::for_field(required(self.from, "from")?, "from")?;
        let to = Username::for_field(required(self.to, "to")?, "to")?;
        if from == to {
            return Err(ValidationError::SelfTransfer(from.to_string()));
        }
        Ok(TransferShares { from, to, shares })
    }
}

/// Build the transfers router.
pub fn router() -> Router<AppState> {
    Router::new().route("/transfer/:id", post(transfer_shares))
}

/// POST /transfer/:id — Transfer shares and recompute the owner.
#[utoipa::path(
    post,
    path = "/transfer/{id}",
    params(("id" = uuid::Uuid, Path, description = "Property ID")),
    request_body = TransferSharesRequest,
    responses(
        (status = 200, description = "Transfer applied", body = PropertyResponse),
        (status = 400, description = "Invalid input, unregistered recipient or insufficient shares", body = crate::error::ErrorBody),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody),
    ),
    tag = "transfers"
)]
pub(crate) async fn transfer_shares(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransferSharesRequest>, JsonRejection>,
) -> Result<Json<PropertyResponse>, AppError> {
    let id = parse_property_id(&id)?;
    let cmd = extract_validated_json(body)?;
    ensure_registered(&state, &cmd.to, "to")?;

    let (receipt, property) = state
        .properties
        .try_update(&id.to_string(), |p| {
            let receipt = p.transfer_shares(&cmd.from, &cmd.to, cmd.shares)?;
            Ok::<_, AppError>((receipt, p.clone()))
        })
        .ok_or_else(|| AppError::from(DomainError::property_not_found(id.to_string())))??;

    tracing::info!(
        property_id = %id,
        from = %cmd.from,
        to = %cmd.to,
        shares = cmd.shares,
        owner = %receipt.owner,
        "shares transferred"
    );
    if receipt.owner_changed() {
        tracing::info!(
            property_id = %id,
            previous_owner = %receipt.previous_owner,
            owner = %receipt.owner,
            "ownership changed hands"
        );
    }

    Ok(Json(PropertyResponse::from(&property)))
}
