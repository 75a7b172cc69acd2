// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/ai-cli/*` handlers: provider lifecycle, persona composer, and
//! narrator (§4.5, §4.7, §4.8, §6.2).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use dashboard_cli_session::provider::PersonaMode;
use dashboard_cli_session::{narrator, persona};
use dashboard_core::error::{ErrorCode, ServiceError};

use crate::http::api_error;
use crate::state::AppState;

fn resolve_provider(s: &str) -> anyhow::Result<dashboard_cli_session::ProviderId> {
    persona::parse_provider_id(s).ok_or_else(|| {
        ServiceError::new(ErrorCode::UnknownTarget, format!("unknown provider: {s}")).into()
    })
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({ "ok": true, "providers": state.providers.list_summaries().await })).into_response()
}

pub async fn list_personas(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({ "ok": true, "personas": state.personas })).into_response()
}

pub async fn session_snapshot(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match run(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn run(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    Ok(p.snapshot().await)
}

pub async fn session_start(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match start(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn start(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    p.ensure_main().await?;
    Ok(p.snapshot().await)
}

pub async fn session_stop(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match stop(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn stop(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    let main = p.main.clone();
    p.stop(&main).await;
    Ok(p.snapshot().await)
}

pub async fn session_restart(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match restart(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn restart(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    let main = p.main.clone();
    p.stop(&main).await;
    p.ensure_main().await?;
    Ok(p.snapshot().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSendBody {
    pub text: String,
    #[serde(default = "default_mode")]
    pub mode: PersonaMode,
    pub persona_id: Option<String>,
}

fn default_mode() -> PersonaMode {
    PersonaMode::Selected
}

pub async fn persona_send(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(body): Json<PersonaSendBody>,
) -> Response {
    match send(&state, &provider, body).await {
        Ok(result) => Json(serde_json::json!({ "ok": true, "result": result })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn send(state: &AppState, provider: &str, body: PersonaSendBody) -> anyhow::Result<persona::ComposerResult> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    persona::send(&p, &state.personas, body.mode, body.persona_id.as_deref(), &body.text).await
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NarrateBody {
    #[serde(default)]
    pub mode: Option<PersonaMode>,
    pub persona_id: Option<String>,
}

pub async fn narrate_last(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(body): Json<NarrateBody>,
) -> Response {
    match narrate(&state, &provider, body).await {
        Ok(result) => Json(serde_json::json!({ "ok": true, "narration": result })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn narrate(state: &AppState, provider: &str, body: NarrateBody) -> anyhow::Result<narrator::NarrationResult> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    narrator::narrate_provider(
        &p,
        &state.personas,
        state.llm.as_ref(),
        state.tts.as_ref(),
        &state.audio_dir,
        body.persona_id.as_deref(),
    )
    .await
}

pub async fn auth_login(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match auth_start(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn auth_start(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    p.start_auth("login").await?;
    Ok(p.snapshot().await)
}

pub async fn auth_status(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match refresh(&state, &provider).await {
        Ok(status) => Json(serde_json::json!({ "ok": true, "authStatus": status })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn refresh(state: &AppState, provider: &str) -> anyhow::Result<dashboard_cli_session::AuthStatus> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    p.refresh_auth_status().await
}

pub async fn auth_logout(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match logout(&state, &provider).await {
        Ok(status) => Json(serde_json::json!({ "ok": true, "authStatus": status })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn logout(state: &AppState, provider: &str) -> anyhow::Result<dashboard_cli_session::AuthStatus> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    p.logout().await
}

pub async fn auth_stop(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    match auth_stop_inner(&state, &provider).await {
        Ok(snapshot) => Json(serde_json::json!({ "ok": true, "provider": snapshot })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn auth_stop_inner(state: &AppState, provider: &str) -> anyhow::Result<serde_json::Value> {
    let id = resolve_provider(provider)?;
    let p = state.providers.get(id)?;
    let auth = p.auth.clone();
    p.stop(&auth).await;
    Ok(p.snapshot().await)
}

#[cfg(test)]
#[path = "ai_cli_tests.rs"]
mod tests;
