//! # API: REST Surface over the Ledger
//!
//! Runs an Axum HTTP server exposing every ledger operation per entity kind,
//! plus health, readiness and Prometheus endpoints.
//!
//! The acting user is read from the `x-actor-id` header; without it the
//! ledger falls back to its configured [`ActorResolver`](crate::ActorResolver).

mod routes_entities;
mod routes_health;

use crate::config::ServerConfig;
use crate::ledger::FleetLedger;
use anyhow::Result;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

pub struct AppState {
    pub ledger: FleetLedger,
}

impl AppState {
    pub fn new(ledger: FleetLedger) -> Arc<Self> {
        Arc::new(AppState { ledger })
    }
}

/// Generate (or propagate) a request ID and run the request inside a
/// tracing span carrying it.
async fn request_id_middleware(req: Request, next: Next) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub fn build_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .route(
            "/api/{kind}",
            get(routes_entities::handler_list).post(routes_entities::handler_create),
        )
        .route(
            "/api/{kind}/{id}",
            get(routes_entities::handler_get)
                .patch(routes_entities::handler_update)
                .delete(routes_entities::handler_delete),
        )
        .route(
            "/api/{kind}/{id}/history",
            get(routes_entities::handler_history),
        )
        .route(
            "/api/{kind}/{id}/verify",
            post(routes_entities::handler_verify),
        )
        .route(
            "/api/{kind}/{id}/status",
            get(routes_entities::handler_status),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(server.request_timeout_secs),
        ))
        .with_state(state)
}

pub async fn run(state: Arc<AppState>, server: &ServerConfig) -> Result<()> {
    let app = build_router(state, server);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port = server.port, "fleetledger api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("fleetledger api shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            },
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received SIGINT, shutting down");
    }
}
