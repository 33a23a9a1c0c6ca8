//! # Properties API
//!
//! Creation, reads, detail updates and deletion of tokenized properties.
//! Share transfers live in [`super::transfers`].
//!
//! An id that is not a well-formed UUID cannot name a stored property and is
//! answered with 404, the same as an unknown id.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use deedshare_core::{
    DomainError, Property, PropertyDetails, PropertyId, ShareLedger, Username, ValidationError,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ensure_registered;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, required, Validate};
use crate::state::AppState;

/// Create-property request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePropertyRequest {
    pub address: Option<String>,
    pub owner: Option<String>,
    #[serde(rename = "deedURL")]
    pub deed_url: Option<String>,
    /// Share supply issued to the owner; at least 1.
    pub shares: Option<u64>,
}

/// Validated create command.
#[derive(Debug)]
pub struct CreateProperty {
    pub details: PropertyDetails,
    pub owner: Username,
    pub supply: u64,
}

impl Validate for CreatePropertyRequest {
    type Valid = CreateProperty;

    fn validate(self) -> Result<CreateProperty, ValidationError> {
        let address = required(self.address, "address")?;
        let owner = Username::for_field(required(self.owner, "owner")?, "owner")?;
        let deed_url = required(self.deed_url, "deedURL")?;
        let supply = required(self.shares, "shares")?;
        if supply == 0 {
            return Err(ValidationError::ZeroShares("shares"));
        }
        Ok(CreateProperty {
            details: PropertyDetails::new(address, deed_url)?,
            owner,
            supply,
        })
    }
}

/// Update-property request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePropertyRequest {
    pub owner: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "deedURL")]
    pub deed_url: Option<String>,
}

impl Validate for UpdatePropertyRequest {
    type Valid = (Username, PropertyDetails);

    fn validate(self) -> Result<Self::Valid, ValidationError> {
        let owner = Username::for_field(required(self.owner, "owner")?, "owner")?;
        let details = PropertyDetails::new(
            required(self.address, "address")?,
            required(self.deed_url, "deedURL")?,
        )?;
        Ok((owner, details))
    }
}

/// Delete-property request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeletePropertyRequest {
    pub username: Option<String>,
}

impl Validate for DeletePropertyRequest {
    type Valid = Username;

    fn validate(self) -> Result<Username, ValidationError> {
        Username::new(required(self.username, "username")?)
    }
}

/// Property as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyResponse {
    pub id: Uuid,
    pub address: String,
    pub owner: String,
    #[serde(rename = "deedURL")]
    pub deed_url: String,
    /// Username → share count, in the order holders first received shares.
    #[schema(value_type = Object)]
    pub tokenized_shares: ShareLedger,
    pub transaction_history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Property> for PropertyResponse {
    fn from(p: &Property) -> Self {
        Self {
            id: *p.id().as_uuid(),
            address: p.address().to_string(),
            owner: p.owner().to_string(),
            deed_url: p.deed_url().to_string(),
            tokenized_shares: p.shares().clone(),
            transaction_history: p.history().to_vec(),
            created_at: p.created_at(),
            updated_at: p.updated_at(),
        }
    }
}

/// Parse a path id; malformed ids are reported as not found.
pub(crate) fn parse_property_id(raw: &str) -> Result<PropertyId, AppError> {
    raw.parse()
        .map_err(|_| DomainError::property_not_found(raw).into())
}

/// Build the properties router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/properties", post(create_property).get(list_properties))
        .route(
            "/properties/:id",
            get(get_property)
                .put(update_property)
                .delete(delete_property),
        )
}

/// POST /properties — Create a tokenized property.
#[utoipa::path(
    post,
    path = "/properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 200, description = "Property created", body = PropertyResponse),
        (status = 400, description = "Invalid input or unregistered owner", body = crate::error::ErrorBody),
    ),
    tag = "properties"
)]
pub(crate) async fn create_property(
    State(state): State<AppState>,
    body: Result<Json<CreatePropertyRequest>, JsonRejection>,
) -> Result<Json<PropertyResponse>, AppError> {
    let cmd = extract_validated_json(body)?;
    ensure_registered(&state, &cmd.owner, "owner")?;

    let property = Property::create(cmd.details, cmd.owner, cmd.supply)?;
    state
        .properties
        .insert(property.id().to_string(), property.clone())?;

    tracing::info!(
        property_id = %property.id(),
        owner = %property.owner(),
        shares = cmd.supply,
        "property created"
    );
    Ok(Json(PropertyResponse::from(&property)))
}

/// GET /properties — List all properties, oldest first.
#[utoipa::path(
    get,
    path = "/properties",
    responses(
        (status = 200, description = "All properties", body = Vec<PropertyResponse>),
    ),
    tag = "properties"
)]
pub(crate) async fn list_properties(State(state): State<AppState>) -> Json<Vec<PropertyResponse>> {
    let mut properties = state.properties.list();
    properties.sort_by_key(|p| (p.created_at(), p.id()));
    Json(properties.iter().map(PropertyResponse::from).collect())
}

/// GET /properties/:id — Get a property.
#[utoipa::path(
    get,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property found", body = PropertyResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "properties"
)]
pub(crate) async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PropertyResponse>, AppError> {
    let id = parse_property_id(&id)?;
    state
        .properties
        .get(&id.to_string())
        .map(|p| Json(PropertyResponse::from(&p)))
        .ok_or_else(|| DomainError::property_not_found(id.to_string()).into())
}

/// PUT /properties/:id — Replace address and deed reference.
///
/// The submitted owner must be a registered user; it is not required to be
/// the current owner and the stored owner is never changed here.
#[utoipa::path(
    put,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Property updated", body = PropertyResponse),
        (status = 400, description = "Invalid input or unregistered owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "properties"
)]
pub(crate) async fn update_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdatePropertyRequest>, JsonRejection>,
) -> Result<Json<PropertyResponse>, AppError> {
    let id = parse_property_id(&id)?;
    let (submitted_owner, details) = extract_validated_json(body)?;
    ensure_registered(&state, &submitted_owner, "owner")?;

    let property = state
        .properties
        .try_update(&id.to_string(), |p| {
            p.update_details(details);
            Ok::<_, AppError>(p.clone())
        })
        .ok_or_else(|| AppError::from(DomainError::property_not_found(id.to_string())))??;

    tracing::info!(
        property_id = %id,
        submitted_by = %submitted_owner,
        owner = %property.owner(),
        "property details updated"
    );
    Ok(Json(PropertyResponse::from(&property)))
}

/// DELETE /properties/:id — Delete a property held entirely by the caller.
#[utoipa::path(
    delete,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = DeletePropertyRequest,
    responses(
        (status = 200, description = "Property deleted", body = PropertyResponse),
        (status = 400, description = "Caller is not the sole owner and shareholder", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "properties"
)]
pub(crate) async fn delete_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DeletePropertyRequest>, JsonRejection>,
) -> Result<Json<PropertyResponse>, AppError> {
    let id = parse_property_id(&id)?;
    let caller = extract_validated_json(body)?;

    let removed = state
        .properties
        .try_remove(&id.to_string(), |p| {
            p.ensure_deletable_by(&caller).map_err(AppError::from)
        })
        .ok_or_else(|| AppError::from(DomainError::property_not_found(id.to_string())))??;

    tracing::info!(property_id = %id, username = %caller, "property deleted");
    Ok(Json(PropertyResponse::from(&removed)))
}
