//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "deedshare API",
        version = "0.1.0",
        description = "Fractional real-estate ownership: user registry, tokenized properties and share transfers with majority-ownership resolution.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Users
        crate::routes::users::register_user,
        crate::routes::users::get_user,
        crate::routes::users::deposit,
        // Properties
        crate::routes::properties::create_property,
        crate::routes::properties::list_properties,
        crate::routes::properties::get_property,
        crate::routes::properties::update_property,
        crate::routes::properties::delete_property,
        // Transfers
        crate::routes::transfers::transfer_shares,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::middleware::metrics::MetricsSnapshot,
        crate::routes::users::RegisterUserRequest,
        crate::routes::users::DepositRequest,
        crate::routes::users::UserResponse,
        crate::routes::properties::CreatePropertyRequest,
        crate::routes::properties::UpdatePropertyRequest,
        crate::routes::properties::DeletePropertyRequest,
        crate::routes::properties::PropertyResponse,
        crate::routes::transfers::TransferSharesRequest,
    )),
    tags(
        (name = "users", description = "User registry and wallet deposits"),
        (name = "properties", description = "Tokenized property lifecycle"),
        (name = "transfers", description = "Share transfers and ownership resolution"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
