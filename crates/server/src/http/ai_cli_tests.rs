// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::http::build_router;
use crate::test_support::{build_test_state, AnyhowExt};

#[tokio::test]
async fn list_providers_returns_all_three() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.get("/api/ai-cli/providers").await;
    resp.assert_status_ok();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    assert_eq!(body["ok"], true);
    let providers = body["providers"].as_array().expect("providers array");
    assert_eq!(providers.len(), 3);
    let ids: Vec<&str> = providers.iter().map(|p| p["id"].as_str().unwrap_or_default()).collect();
    assert!(ids.contains(&"codex"));
    assert!(ids.contains(&"claude"));
    assert!(ids.contains(&"gemini"));
    Ok(())
}

#[tokio::test]
async fn list_personas_returns_seeded_roster() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.get("/api/ai-cli/personas").await;
    resp.assert_status_ok();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    let personas = body["personas"].as_array().expect("personas array");
    assert!(!personas.is_empty());
    assert!(personas[0]["voiceId"].is_string());
    Ok(())
}

#[tokio::test]
async fn session_snapshot_unknown_provider_is_404() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.get("/api/ai-cli/session/not-a-provider").await;
    resp.assert_status_not_found();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    assert_eq!(body["ok"], false);
    Ok(())
}

#[tokio::test]
async fn session_snapshot_known_provider_starts_idle() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.get("/api/ai-cli/session/codex").await;
    resp.assert_status_ok();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    assert_eq!(body["provider"]["main"]["running"], false);
    assert_eq!(body["provider"]["authStatus"]["state"], "unknown");
    Ok(())
}

#[tokio::test]
async fn persona_send_fails_when_main_not_running() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server
        .post("/api/ai-cli/session/codex/persona/send")
        .json(&serde_json::json!({ "text": "hi", "mode": "selected", "personaId": "aria" }))
        .await;
    resp.assert_status(axum::http::StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn narrate_last_fails_without_prior_interaction() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server
        .post("/api/ai-cli/session/codex/narrate-last")
        .json(&serde_json::json!({ "mode": "selected" }))
        .await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn auth_logout_unsupported_for_gemini() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.post("/api/ai-cli/session/gemini/auth/logout").await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn responses_carry_no_store_cache_control() -> anyhow::Result<()> {
    let (state, _dir) = build_test_state().await?;
    let server = axum_test::TestServer::new(build_router(state)).anyhow()?;

    let resp = server.get("/api/ai-cli/providers").await;
    resp.assert_status_ok();
    let cache_control = resp.header("cache-control");
    assert_eq!(cache_control, "no-store");
    Ok(())
}
