// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket message schema and the per-connection fan-out loop shared by
//! the CLI session service's `/api/ai-cli/ws` and the harness's
//! `/api/harness/ws` endpoints.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::pty::supervisor::{Channel, LifecycleEvent};

/// clamp bounds for client-requested resizes.
pub const COLS_RANGE: (u16, u16) = (20, 400);
pub const ROWS_RANGE: (u16, u16) = (5, 200);

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "hello")]
    Hello { state: serde_json::Value },
    #[serde(rename = "snapshot")]
    Snapshot { data: String },
    #[serde(rename = "output")]
    Output { data: String },
    #[serde(rename = "state")]
    State { state: serde_json::Value },
    #[serde(rename = "exit")]
    Exit { code: Option<i32>, signal: Option<i32> },
    #[serde(rename = "auth_hint")]
    AuthHint { url: Option<String>, code: Option<String>, text: String },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "pong")]
    Pong { ts: i64 },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "ping")]
    Ping { ts: i64 },
    #[serde(rename = "input")]
    Input { data: String },
    #[serde(rename = "resize")]
    Resize { cols: u16, rows: u16 },
}

fn clamp(value: u16, range: (u16, u16)) -> u16 {
    value.clamp(range.0, range.1)
}

/// Run one attached WebSocket connection against `channel` until the
/// client disconnects. `state_fn` produces the current domain-specific
/// snapshot (provider or run state) for `hello`/`state` messages.
/// `is_auth_channel` gates whether `auth_hint` events (emitted by the
/// caller via `auth_hint_rx`) are relevant to this connection.
pub async fn run_connection(
    socket: WebSocket,
    channel: Arc<Channel>,
    state_fn: Arc<dyn Fn() -> serde_json::Value + Send + Sync>,
    mut auth_hint_rx: Option<tokio::sync::broadcast::Receiver<ServerMessage>>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let hello = ServerMessage::Hello { state: state_fn() };
    if send(&mut ws_tx, &hello).await.is_err() {
        return;
    }

    // Subscribe and dump atomically so no chunk ingested in between is
    // dropped from both the snapshot and the tail (§8 property 2, S6).
    let (snapshot, mut output_rx) = channel.subscribe_output_and_dump().await;
    if !snapshot.is_empty() {
        let data = String::from_utf8_lossy(&snapshot).into_owned();
        if send(&mut ws_tx, &ServerMessage::Snapshot { data }).await.is_err() {
            return;
        }
    }

    let mut lifecycle_rx = channel.subscribe_lifecycle();

    loop {
        tokio::select! {
            output = output_rx.recv() => {
                match output {
                    Ok(bytes) => {
                        let data = String::from_utf8_lossy(&bytes).into_owned();
                        if send(&mut ws_tx, &ServerMessage::Output { data }).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            lifecycle = lifecycle_rx.recv() => {
                match lifecycle {
                    Ok(LifecycleEvent::State(state)) => {
                        if send(&mut ws_tx, &ServerMessage::State { state }).await.is_err() {
                            break;
                        }
                    }
                    Ok(LifecycleEvent::Exit { code, signal }) => {
                        let _ = send(&mut ws_tx, &ServerMessage::Exit { code, signal }).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            hint = recv_optional(&mut auth_hint_rx) => {
                if let Some(msg) = hint {
                    if send(&mut ws_tx, &msg).await.is_err() {
                        break;
                    }
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_client_message(&text, &channel, &mut ws_tx).await.is_break() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

async fn recv_optional(
    rx: &mut Option<tokio::sync::broadcast::Receiver<ServerMessage>>,
) -> Option<ServerMessage> {
    match rx {
        Some(r) => match r.recv().await {
            Ok(msg) => Some(msg),
            Err(_) => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

async fn handle_client_message(
    text: &str,
    channel: &Arc<Channel>,
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) -> std::ops::ControlFlow<()> {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(ClientMessage::Ping { ts }) => {
            if send(ws_tx, &ServerMessage::Pong { ts }).await.is_err() {
                return std::ops::ControlFlow::Break(());
            }
        }
        Ok(ClientMessage::Input { data }) => {
            if let Err(e) = channel.write(data.as_bytes()).await {
                let _ = send(ws_tx, &ServerMessage::Error { message: e.to_string() }).await;
            }
        }
        Ok(ClientMessage::Resize { cols, rows }) => {
            let cols = clamp(cols, COLS_RANGE);
            let rows = clamp(rows, ROWS_RANGE);
            // `Channel::resize` always updates the stored size and only
            // forwards to the running backend when one is attached.
            let _ = channel.resize(cols, rows).await;
        }
        Err(e) => {
            let _ = send(ws_tx, &ServerMessage::Error { message: format!("invalid message: {e}") }).await;
        }
    }
    std::ops::ControlFlow::Continue(())
}

async fn send(
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap_or_else(|_| "{\"type\":\"error\"}".to_owned());
    ws_tx.send(Message::Text(text.into())).await
}
