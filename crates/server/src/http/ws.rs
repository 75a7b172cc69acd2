// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/ai-cli/ws` and `/api/harness/ws` upgrade handlers (§6.3). Both
//! resolve their target and channel before upgrading, returning a plain
//! 404 if either is unknown, then hand off to
//! `dashboard_core::ws::run_connection`.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use dashboard_core::ws::run_connection;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AiCliWsQuery {
    pub provider: String,
    pub channel: String,
}

pub async fn ws_ai_cli(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AiCliWsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(provider_id) = dashboard_cli_session::persona::parse_provider_id(&query.provider) else {
        return (StatusCode::NOT_FOUND, "unknown provider").into_response();
    };
    let Ok(provider) = state.providers.get(provider_id) else {
        return (StatusCode::NOT_FOUND, "unknown provider").into_response();
    };
    let channel = match query.channel.as_str() {
        "main" => Arc::clone(&provider.main),
        "auth" => Arc::clone(&provider.auth),
        _ => return (StatusCode::NOT_FOUND, "unknown channel").into_response(),
    };

    let auth_hint_rx =
        if query.channel == "auth" { state.auth_hints.get(&provider_id).map(|tx| tx.subscribe()) } else { None };

    let provider_for_state = Arc::clone(&provider);
    let hello_state = provider_for_state.snapshot().await;
    let state_fn: Arc<dyn Fn() -> serde_json::Value + Send + Sync> = Arc::new(move || hello_state.clone());

    ws.on_upgrade(move |socket| async move {
        run_connection(socket, channel, state_fn, auth_hint_rx).await;
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessWsQuery {
    pub run_id: String,
    pub channel: String,
}

pub async fn ws_harness(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HarnessWsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Ok(run) = state.harness.get(&query.run_id).await else {
        return (StatusCode::NOT_FOUND, "unknown run").into_response();
    };

    // Named channels (`orchestrator`, `parent`, `subtask-<i>`,
    // `browser-worker`) are created lazily by the pipeline as each stage
    // starts (§4.9); a connect attempt before that point has nothing to
    // attach to yet.
    let Some(channel) = run.get_channel(&query.channel).await else {
        return (StatusCode::NOT_FOUND, "channel not ready").into_response();
    };

    let hello_state = serde_json::to_value(run.snapshot().await).unwrap_or(serde_json::Value::Null);
    let state_fn: Arc<dyn Fn() -> serde_json::Value + Send + Sync> = Arc::new(move || hello_state.clone());

    ws.on_upgrade(move |socket| async move {
        run_connection(socket, channel, state_fn, None).await;
    })
    .into_response()
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
