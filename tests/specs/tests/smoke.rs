// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `dashboard-api` binary and
//! exercise its HTTP and WebSocket surface as an external client would.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use dashboard_specs::DashboardProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn http_health_and_ready() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value = reqwest::get(format!("{}/api/v1/health", dashboard.base_url())).await?.json().await?;
    assert_eq!(resp["ok"], true);

    let resp: serde_json::Value = reqwest::get(format!("{}/api/v1/ready", dashboard.base_url())).await?.json().await?;
    assert_eq!(resp["ok"], true);
    assert!(resp["dataDir"].is_string());

    Ok(())
}

#[tokio::test]
async fn http_lists_providers_and_personas() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/ai-cli/providers", dashboard.base_url())).await?.json().await?;
    assert_eq!(resp["ok"], true);
    let providers = resp["providers"].as_array().ok_or_else(|| anyhow::anyhow!("providers not an array"))?;
    assert_eq!(providers.len(), 3);

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/ai-cli/personas", dashboard.base_url())).await?.json().await?;
    let personas = resp["personas"].as_array().ok_or_else(|| anyhow::anyhow!("personas not an array"))?;
    assert!(!personas.is_empty());

    Ok(())
}

#[tokio::test]
async fn http_session_snapshot_starts_idle_then_404s_unknown_provider() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/api/ai-cli/session/codex", dashboard.base_url())).await?;
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["provider"]["main"]["running"], false);

    let resp = reqwest::get(format!("{}/api/ai-cli/session/not-a-provider", dashboard.base_url())).await?;
    assert_eq!(resp.status().as_u16(), 404);

    Ok(())
}

#[tokio::test]
async fn http_harness_config_reports_max_subtasks() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/harness/config", dashboard.base_url())).await?.json().await?;
    assert_eq!(resp["config"]["maxSubtasks"], 3);

    let resp: serde_json::Value = reqwest::get(format!("{}/api/harness/runs", dashboard.base_url())).await?.json().await?;
    assert_eq!(resp["runs"].as_array().map(|a| a.len()), Some(0));

    Ok(())
}

#[tokio::test]
async fn http_create_run_validates_task_input() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/harness/runs", dashboard.base_url()))
        .json(&serde_json::json!({ "title": "", "objective": "", "repoPath": "" }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .post(format!("{}/api/harness/runs", dashboard.base_url()))
        .json(&serde_json::json!({
            "title": "demo",
            "objective": "prove the wiring works",
            "repoPath": "r1",
            "subtaskCount": 0,
        }))
        .send()
        .await?;
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await?;
    let run_id = body["run"]["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing run id"))?.to_owned();

    let resp: serde_json::Value =
        client.get(format!("{}/api/harness/runs/{run_id}", dashboard.base_url())).send().await?.json().await?;
    assert_eq!(resp["run"]["id"], run_id);

    Ok(())
}

#[tokio::test]
async fn ws_ai_cli_upgrades_for_known_channel_and_404s_unknown_provider() -> anyhow::Result<()> {
    let dashboard = DashboardProcess::start()?;
    dashboard.wait_healthy(TIMEOUT).await?;

    let url = format!("{}/api/ai-cli/ws?provider=codex&channel=main", dashboard.ws_url());
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await?;

    let msg = tokio::time::timeout(TIMEOUT, ws.next()).await?.ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    let text = match msg {
        Message::Text(t) => t.to_string(),
        other => anyhow::bail!("expected a text hello frame, got: {other:?}"),
    };
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert!(parsed.get("type").is_some());
    ws.send(Message::Close(None)).await?;

    let bad_url = format!("{}/api/ai-cli/ws?provider=not-a-provider&channel=main", dashboard.ws_url());
    let err = tokio_tungstenite::connect_async(&bad_url).await.expect_err("unknown provider should be rejected");
    assert!(err.to_string().contains("404") || format!("{err:?}").contains("404"));

    Ok(())
}
