//! # Integration Tests for deedshare-api
//!
//! Drives the assembled router end to end: registration and deposits,
//! property lifecycle, share transfers with ownership resolution, deletion
//! rules, authentication, operational routes and snapshot persistence across
//! a restart.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use deedshare_api::db::init_data_dir;
use deedshare_api::state::{AppConfig, AppState};
use deedshare_core::ShareLedger;
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper: build the test app with auth disabled and in-memory stores.
fn test_app() -> axum::Router {
    deedshare_api::app(AppState::new())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    deedshare_api::app(AppState::with_config(config))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Share ledger of a property response, in wire order.
#[derive(Deserialize)]
struct LedgerOnly {
    #[serde(rename = "tokenizedShares")]
    shares: ShareLedger,
}

fn ledger_order(bytes: &[u8]) -> Vec<(String, u64)> {
    let parsed: LedgerOnly = serde_json::from_slice(bytes).unwrap();
    parsed
        .shares
        .iter()
        .map(|h| (h.holder.to_string(), h.shares))
        .collect()
}

async fn send(app: &axum::Router, request: Request<Body>) -> axum::http::Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn register(app: &axum::Router, username: &str) {
    let response = send(
        app,
        json_request(
            "POST",
            "/users",
            json!({"username": username, "email": format!("{username}@example.com"), "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "register {username}");
}

async fn create_property(app: &axum::Router, owner: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/properties",
            json!({"address": "12 Harbour Rd", "owner": owner, "deedURL": "ipfs://deed-12", "shares": 100}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn transfer(app: &axum::Router, id: &str, from: &str, to: &str, shares: u64) -> axum::http::Response<Body> {
    send(
        app,
        json_request(
            "POST",
            &format!("/transfer/{id}"),
            json!({"from": from, "to": to, "shares": shares}),
        ),
    )
    .await
}

// -- Health & Operational Routes ----------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = send(&test_app(), get("/health/liveness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = send(&test_app(), get("/health/readiness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ready");
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let response = send(&test_app(), get("/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert!(spec["paths"]["/transfer/{id}"].is_object());
}

#[tokio::test]
async fn test_metrics_count_business_requests() {
    let app = test_app();
    register(&app, "alice").await;
    let response = send(&app, get("/properties/not-a-uuid")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let metrics = body_json(response).await;
    assert_eq!(metrics["requests"], 2);
    assert_eq!(metrics["errors"], 1);
    assert_eq!(metrics["users"], 1);
    assert_eq!(metrics["properties"], 0);
}

// -- Ownership Scenario -------------------------------------------------------

#[tokio::test]
async fn test_majority_ownership_scenario() {
    let app = test_app();
    register(&app, "alice").await;
    let id = create_property(&app, "alice").await;
    register(&app, "bob").await;

    let response = send(&app, get(&format!("/properties/{id}"))).await;
    let bytes = body_bytes(response).await;
    assert_eq!(ledger_order(&bytes), vec![("alice".into(), 100)]);

    let response = transfer(&app, &id, "alice", "bob", 60).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_eq!(
        ledger_order(&bytes),
        vec![("alice".into(), 40), ("bob".into(), 60)]
    );
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["owner"], "bob");

    let response = transfer(&app, &id, "bob", "alice", 30).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_eq!(
        ledger_order(&bytes),
        vec![("alice".into(), 70), ("bob".into(), 30)]
    );
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["owner"], "alice");
    assert_eq!(
        body["transactionHistory"],
        json!([
            "Property created by alice with 100 shares",
            "Transferred 60 shares from alice to bob",
            "Transferred 30 shares from bob to alice",
        ])
    );
}

#[tokio::test]
async fn test_tie_keeps_earliest_holder() {
    let app = test_app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    let id = create_property(&app, "alice").await;

    let response = transfer(&app, &id, "alice", "bob", 50).await;
    assert_eq!(body_json(response).await["owner"], "alice");
}

#[tokio::test]
async fn test_insufficient_shares_leaves_property_unchanged() {
    let app = test_app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    let id = create_property(&app, "alice").await;
    transfer(&app, &id, "alice", "bob", 60).await;

    let before = body_json(send(&app, get(&format!("/properties/{id}"))).await).await;

    let response = transfer(&app, &id, "alice", "bob", 41).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = body_json(response).await;
    assert_eq!(err["code"], "INSUFFICIENT_SHARES");
    assert!(err["error"].is_string());

    let after = body_json(send(&app, get(&format!("/properties/{id}"))).await).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_transfer_from_non_holder_is_insufficient() {
    let app = test_app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    register(&app, "carol").await;
    let id = create_property(&app, "alice").await;

    let response = transfer(&app, &id, "carol", "bob", 1).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INSUFFICIENT_SHARES");
}

#[tokio::test]
async fn test_share_total_is_conserved_across_transfers() {
    let app = test_app();
    for name in ["alice", "bob", "carol"] {
        register(&app, name).await;
    }
    let id = create_property(&app, "alice").await;

    let moves = [
        ("alice", "bob", 30),
        ("alice", "carol", 25),
        ("bob", "carol", 10),
        ("carol", "alice", 5),
        ("bob", "alice", 500),
    ];
    for (from, to, shares) in moves {
        let response = transfer(&app, &id, from, to, shares).await;
        let bytes = body_bytes(response).await;
        if let Ok(parsed) = serde_json::from_slice::<LedgerOnly>(&bytes) {
            assert_eq!(parsed.shares.total(), 100);
        }
    }

    let bytes = body_bytes(send(&app, get(&format!("/properties/{id}"))).await).await;
    let total: u64 = ledger_order(&bytes).iter().map(|(_, n)| n).sum();
    assert_eq!(total, 100);
}

// -- Deletion -----------------------------------------------------------------

#[tokio::test]
async fn test_delete_rules() {
    let app = test_app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    let id = create_property(&app, "alice").await;
    let uri = format!("/properties/{id}");
    transfer(&app, &id, "alice", "bob", 10).await;

    // Owner, but bob also holds shares.
    let response = send(&app, json_request("DELETE", &uri, json!({"username": "alice"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    // Not the owner.
    let response = send(&app, json_request("DELETE", &uri, json!({"username": "bob"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Bob gives everything back: his entry is pruned and alice is sole holder.
    let response = transfer(&app, &id, "bob", "alice", 10).await;
    let bytes = body_bytes(response).await;
    assert_eq!(ledger_order(&bytes), vec![("alice".into(), 100)]);

    let response = send(&app, json_request("DELETE", &uri, json!({"username": "alice"}))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, json_request("DELETE", &uri, json!({"username": "alice"}))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Registration -------------------------------------------------------------

#[tokio::test]
async fn test_second_registration_conflicts() {
    let app = test_app();
    register(&app, "alice").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/users",
            json!({"username": "alice", "email": "new@example.com", "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    let response = send(
        &app,
        json_request(
            "POST",
            "/users",
            json!({"username": "alicia", "email": "alice@example.com", "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&test_app(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = body_json(response).await;
    assert_eq!(err["code"], "BAD_REQUEST");
    assert!(err["error"].is_string());
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_required_for_business_routes() {
    let app = test_app_with_auth("s3cret");

    let response = send(&app, get("/properties")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/properties")
        .header("Authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_operational_routes_skip_auth() {
    let app = test_app_with_auth("s3cret");
    for uri in ["/health/liveness", "/health/readiness", "/metrics", "/openapi.json"] {
        let response = send(&app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

// -- Persistence --------------------------------------------------------------

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let data = init_data_dir(Some(dir.path())).unwrap().unwrap();

    let app = deedshare_api::app(AppState::open(AppConfig::default(), &data).unwrap());
    register(&app, "alice").await;
    register(&app, "bob").await;
    let id = create_property(&app, "alice").await;
    transfer(&app, &id, "alice", "bob", 60).await;
    send(
        &app,
        json_request("POST", "/users/deposit", json!({"username": "bob", "amount": 25.5})),
    )
    .await;
    let before = body_bytes(send(&app, get(&format!("/properties/{id}"))).await).await;
    drop(app);

    let restarted = deedshare_api::app(AppState::open(AppConfig::default(), &data).unwrap());

    let after = body_bytes(send(&restarted, get(&format!("/properties/{id}"))).await).await;
    assert_eq!(ledger_order(&after), ledger_order(&before));
    let before: Value = serde_json::from_slice(&before).unwrap();
    let after: Value = serde_json::from_slice(&after).unwrap();
    assert_eq!(before, after);
    assert_eq!(after["owner"], "bob");

    let bob = body_json(send(&restarted, get("/users/bob")).await).await;
    assert_eq!(bob["walletTokens"], json!(25.5));

    // Registrations still conflict after the restart.
    let response = send(
        &restarted,
        json_request(
            "POST",
            "/users",
            json!({"username": "alice", "email": "x@example.com", "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_transfers_do_not_lose_updates() {
    let state = AppState::new();
    let app = deedshare_api::app(state.clone());
    register(&app, "alice").await;
    register(&app, "bob").await;
    let response = send(
        &app,
        json_request(
            "POST",
            "/properties",
            json!({"address": "1 Main St", "owner": "alice", "deedURL": "d", "shares": 1000}),
        ),
    )
    .await;
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let app = app.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            transfer(&app, &id, "alice", "bob", 1).await.status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let bytes = body_bytes(send(&app, get(&format!("/properties/{id}"))).await).await;
    assert_eq!(
        ledger_order(&bytes),
        vec![("alice".into(), 950), ("bob".into(), 50)]
    );
    let stored = state.properties.get(&id).unwrap();
    assert_eq!(stored.history().len(), 51);
}
