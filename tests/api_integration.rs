//! API integration tests for the fleetledger Axum REST endpoints.
//!
//! Requests go straight to the router via `tower::ServiceExt::oneshot`, so no
//! TCP listener is started. The router is backed by a `MemoryStore` and a
//! fixed clock, so these tests need no database.
//!
//! ```bash
//! cargo test --test api_integration
//! ```

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use fleetledger::api::{build_router, AppState};
use fleetledger::config::ServerConfig;
use fleetledger::store::MemoryStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryStore>) {
    let (ledger, store, _clock) = common::memory_ledger();
    let router = build_router(AppState::new(ledger), &ServerConfig::default());
    (router, store)
}

/// Sends a request and returns the status code and parsed JSON body
/// (`null` when the body is empty or not JSON).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    actor: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!(null));
    (status, json)
}

async fn create_trailer(app: &Router) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/trailers",
        Some(json!({"trailerNumber": "T-7", "status": "Active", "cleanlinessRating": 2})),
        Some("op-1"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

// == Health ===================================================================

#[tokio::test]
async fn healthz_and_readyz_are_ok() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reports_unreachable_store() {
    let (app, store) = app();
    store.fail_reads(true);
    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_count_updates_by_kind() {
    let (app, _) = app();
    let id = create_trailer(&app).await;
    send(
        &app,
        "PATCH",
        &format!("/api/trailers/{id}"),
        Some(json!({"status": "In Shop"})),
        Some("op-2"),
    )
    .await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("fleetledger_updates_total"));
    assert!(text.contains("fleetledger_history_rows_total"));
    assert!(text.contains("kind=\"trailers\""));
}

// == Entity CRUD ==============================================================

#[tokio::test]
async fn create_get_and_list() {
    let (app, _) = app();
    let id = create_trailer(&app).await;

    let (status, json) = send(&app, "GET", &format!("/api/trailers/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trailer_number"], "T-7");
    assert_eq!(json["cleanliness_rating"], 2);
    assert_eq!(json["updated_by"], "op-1");

    let (status, json) = send(&app, "GET", "/api/trailers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(1));

    let (_, json) = send(&app, "GET", "/api/mixers", None, None).await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn patch_records_history() {
    let (app, _) = app();
    let id = create_trailer(&app).await;

    let (status, json) = send(
        &app,
        "PATCH",
        &format!("/api/trailers/{id}"),
        Some(json!({"status": "In Shop", "cleanlinessRating": "2", "assignedTractor": "0"})),
        Some("op-2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "In Shop");
    assert_eq!(json["updated_by"], "op-2");
    assert!(json.get("audit_warning").is_none());

    let (status, json) = send(&app, "GET", &format!("/api/trailers/{id}/history"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["field_name"], "status");
    assert_eq!(rows[0]["old_value"], "Active");
    assert_eq!(rows[0]["new_value"], "In Shop");
    assert_eq!(rows[0]["changed_by"], "op-2");
}

#[tokio::test]
async fn patch_with_failed_history_returns_warning() {
    let (app, store) = app();
    let id = create_trailer(&app).await;
    store.fail_history(true);

    let (status, json) = send(
        &app,
        "PATCH",
        &format!("/api/trailers/{id}"),
        Some(json!({"status": "Retired"})),
        Some("op-2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Retired");
    assert!(json["audit_warning"].as_str().is_some());
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let (app, store) = app();
    let id = create_trailer(&app).await;
    send(
        &app,
        "PATCH",
        &format!("/api/trailers/{id}"),
        Some(json!({"status": "Retired"})),
        Some("op-2"),
    )
    .await;
    assert_eq!(store.history_len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/trailers/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.history_len(), 0);

    let (status, _) = send(&app, "GET", &format!("/api/trailers/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Verification and status ==================================================

#[tokio::test]
async fn verify_then_status_is_verified() {
    let (app, _) = app();
    let id = create_trailer(&app).await;

    let (_, json) = send(&app, "GET", &format!("/api/trailers/{id}/status"), None, None).await;
    assert_eq!(json["verified"], false);
    assert_eq!(json["service_overdue"], true);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/trailers/{id}/verify"),
        None,
        Some("op-3"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated_by"], "op-3");
    assert!(json["updated_last"].is_string());

    let (_, json) = send(&app, "GET", &format!("/api/trailers/{id}/status"), None, None).await;
    assert_eq!(json["verified"], true);
}

// == Error mapping ============================================================

#[tokio::test]
async fn errors_map_to_status_codes() {
    let (app, _) = app();
    let id = create_trailer(&app).await;
    let missing = uuid::Uuid::new_v4();

    let cases = [
        ("GET", "/api/tractors".to_string(), None, None, StatusCode::NOT_FOUND),
        ("GET", "/api/trailers/not-a-uuid".to_string(), None, None, StatusCode::BAD_REQUEST),
        (
            "GET",
            format!("/api/trailers/{missing}"),
            None,
            None,
            StatusCode::NOT_FOUND,
        ),
        (
            "PATCH",
            format!("/api/trailers/{id}"),
            Some(json!({"status": "Retired"})),
            None,
            StatusCode::UNAUTHORIZED,
        ),
        (
            "PATCH",
            format!("/api/trailers/{id}"),
            Some(json!({"assignedOperator": "op-9"})),
            Some("op-2"),
            StatusCode::BAD_REQUEST,
        ),
        (
            "PATCH",
            format!("/api/trailers/{id}"),
            Some(json!({"trailerNumber": ""})),
            Some("op-2"),
            StatusCode::BAD_REQUEST,
        ),
        (
            "PATCH",
            format!("/api/trailers/{missing}"),
            Some(json!({"status": "Retired"})),
            Some("op-2"),
            StatusCode::NOT_FOUND,
        ),
        (
            "POST",
            "/api/trailers".to_string(),
            Some(json!({"status": "Active"})),
            Some("op-2"),
            StatusCode::BAD_REQUEST,
        ),
    ];
    for (method, uri, body, actor, expected) in cases {
        let (status, json) = send(&app, method, &uri, body, actor).await;
        assert_eq!(status, expected, "{method} {uri}");
        assert!(json["error"].is_string(), "{method} {uri}: {json}");
    }
}

#[tokio::test]
async fn storage_failure_is_500() {
    let (app, store) = app();
    let id = create_trailer(&app).await;
    store.fail_updates(true);
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/trailers/{id}"),
        Some(json!({"status": "Retired"})),
        Some("op-2"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}
