// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade tests using real connections against an in-process
//! axum server, mirroring how the rest of the workspace tests upgrade
//! handlers (a plain `TestServer::get` never sends the `Upgrade` header,
//! so it can't exercise `WebSocketUpgrade` at all).

use std::net::SocketAddr;

use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::http::build_router;
use crate::test_support::build_test_state;

async fn spawn_server() -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>, tempfile::TempDir)> {
    let (state, dir) = build_test_state().await?;
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle, dir))
}

/// Attempt a websocket handshake and return the HTTP status code the
/// server answered with, whether or not the upgrade itself succeeded.
async fn handshake_status(url: &str) -> anyhow::Result<StatusCode> {
    match tokio_tungstenite::connect_async(url).await {
        Ok(_) => Ok(StatusCode::SWITCHING_PROTOCOLS),
        Err(WsError::Http(response)) => Ok(response.status()),
        Err(other) => Err(anyhow::anyhow!("handshake failed: {other}")),
    }
}

#[tokio::test]
async fn ai_cli_ws_rejects_unknown_provider() -> anyhow::Result<()> {
    let (addr, handle, _dir) = spawn_server().await?;

    let status = handshake_status(&format!("ws://{addr}/api/ai-cli/ws?provider=not-a-provider&channel=main")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn ai_cli_ws_rejects_unknown_channel() -> anyhow::Result<()> {
    let (addr, handle, _dir) = spawn_server().await?;

    let status = handshake_status(&format!("ws://{addr}/api/ai-cli/ws?provider=codex&channel=bogus")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn ai_cli_ws_upgrades_for_known_provider_and_channel() -> anyhow::Result<()> {
    let (addr, handle, _dir) = spawn_server().await?;

    let status = handshake_status(&format!("ws://{addr}/api/ai-cli/ws?provider=codex&channel=main")).await?;
    assert_eq!(status, StatusCode::SWITCHING_PROTOCOLS);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn harness_ws_rejects_unknown_run() -> anyhow::Result<()> {
    let (addr, handle, _dir) = spawn_server().await?;

    let status = handshake_status(&format!("ws://{addr}/api/harness/ws?runId=run-does-not-exist&channel=orchestrator")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn harness_ws_rejects_channel_not_yet_created() -> anyhow::Result<()> {
    let (addr, handle, _dir) = spawn_server().await?;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/api/harness/runs"))
        .json(&serde_json::json!({
            "title": "demo",
            "objective": "prove the wiring works",
            "repoPath": "r1",
            "subtaskCount": 0,
        }))
        .send()
        .await?;
    let body: serde_json::Value = resp.json().await?;
    let run_id = body["run"]["id"].as_str().expect("run id").to_owned();

    let status =
        handshake_status(&format!("ws://{addr}/api/harness/ws?runId={run_id}&channel=subtask-9")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    handle.abort();
    Ok(())
}
