//! Entity endpoints: CRUD, history, verification and derived status.
//!
//! Ledger errors map to `400` (invalid argument), `401` (no actor), `404`
//! (unknown kind or id) and `500` (storage). An update whose history rows
//! failed to persist still returns `200`, with an `audit_warning` field next
//! to the entity.

use super::AppState;
use crate::entity::Payload;
use crate::error::LedgerError;
use crate::kinds::EntityKind;
use crate::ledger::UpdateOutcome;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const ACTOR_HEADER: &str = "x-actor-id";

fn error_response(err: LedgerError) -> Response {
    let status = match &err {
        LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LedgerError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::Storage(e) => {
            warn!(error = %e, "storage error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

fn parse_kind(raw: &str) -> Result<EntityKind, Response> {
    raw.parse::<EntityKind>()
        .map_err(|e| (StatusCode::NOT_FOUND, Json(json!({"error": e}))).into_response())
}

fn actor(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACTOR_HEADER).and_then(|v| v.to_str().ok())
}

fn update_body(outcome: UpdateOutcome) -> Value {
    let warning = outcome.audit_warning().map(str::to_string);
    let mut body = outcome.into_entity().to_json();
    if let (Some(warning), Some(obj)) = (warning, body.as_object_mut()) {
        obj.insert("audit_warning".into(), Value::String(warning));
    }
    body
}

pub(super) async fn handler_list(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.list(kind).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_create(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.create(kind, &payload, actor(&headers)).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_get(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.get(kind, &id).await {
        Ok(row) => Json(row).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_update(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state
        .ledger
        .update(kind, &id, &payload, actor(&headers))
        .await
    {
        Ok(outcome) => Json(update_body(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_delete(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.delete(kind, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_history(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.history(kind, &id).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_verify(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.verify(kind, &id, actor(&headers)).await {
        Ok(row) => Json(row).into_response(),
        Err(e) => error_response(e),
    }
}

pub(super) async fn handler_status(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.ledger.status(kind, &id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}
