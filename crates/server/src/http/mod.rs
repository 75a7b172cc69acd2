// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API contract and axum router: one submodule per resource.

pub mod ai_cli;
pub mod harness;
pub mod ws;

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use dashboard_core::error::classify;

use crate::state::AppState;

/// Attach `Cache-Control: no-store` to every JSON response (§6.2), except
/// WebSocket upgrades and raw artifact downloads which set their own
/// headers.
async fn no_store_layer(req: axum::extract::Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut().insert("cache-control", HeaderValue::from_static("no-store"));
    resp
}

/// Convert any handler error into the `{ok: false, error}` envelope (§6.2,
/// §7) with the status `ErrorCode::http_status()` maps to.
pub fn api_error(err: anyhow::Error) -> Response {
    let (code, detail) = classify(&err);
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "ok": false, "error": detail }))).into_response()
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ai-cli/providers", get(ai_cli::list_providers))
        .route("/api/ai-cli/personas", get(ai_cli::list_personas))
        .route("/api/ai-cli/session/{provider}", get(ai_cli::session_snapshot))
        .route("/api/ai-cli/session/{provider}/start", post(ai_cli::session_start))
        .route("/api/ai-cli/session/{provider}/stop", post(ai_cli::session_stop))
        .route("/api/ai-cli/session/{provider}/restart", post(ai_cli::session_restart))
        .route("/api/ai-cli/session/{provider}/persona/send", post(ai_cli::persona_send))
        .route("/api/ai-cli/session/{provider}/narrate-last", post(ai_cli::narrate_last))
        .route("/api/ai-cli/session/{provider}/auth/login", post(ai_cli::auth_login))
        .route("/api/ai-cli/session/{provider}/auth/status", post(ai_cli::auth_status))
        .route("/api/ai-cli/session/{provider}/auth/logout", post(ai_cli::auth_logout))
        .route("/api/ai-cli/session/{provider}/auth/stop", post(ai_cli::auth_stop))
        .route("/api/harness/config", get(harness::harness_config))
        .route("/api/harness/runs", get(harness::list_runs).post(harness::create_run))
        .route("/api/harness/runs/{id}", get(harness::get_run))
        .route("/api/harness/runs/{id}/stop", post(harness::stop_run))
        .route("/api/harness/runs/{id}/artifacts", get(harness::list_artifacts))
        .route("/api/harness/runs/{id}/artifacts/{aid}", get(harness::get_artifact))
        .route("/api/harness/runs/{id}/narrate-summary", post(harness::narrate_summary))
        .route("/api/ai-cli/ws", get(ws::ws_ai_cli))
        .route("/api/harness/ws", get(ws::ws_harness))
        .layer(middleware::from_fn(no_store_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Minimal health-only router.
pub fn build_health_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/ready", get(ready))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn ready(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "dataDir": state.data_dir.to_string_lossy() }))
}
