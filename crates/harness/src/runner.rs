// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY command runner (§4.11): attaches a one-shot command to an
//! existing named channel, streams its output through the same pipeline
//! as interactive sessions (ring buffer, transcript, segment log,
//! sinks), and resolves with a capped raw/plain accumulation once the
//! child exits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashboard_core::error::{ErrorCode, ServiceError};
use dashboard_core::pty::supervisor::{Channel, LifecycleEvent};
use tokio_util::sync::CancellationToken;

/// Cap on each of the raw and plain accumulators (§4.11).
pub const MAX_CAPTURE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub raw: Vec<u8>,
    pub plain: String,
}

/// Single-quote wrap with the `'\''` escape for embedded quotes (§4.11).
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn push_capped_bytes(buf: &mut Vec<u8>, data: &[u8], cap: usize) {
    buf.extend_from_slice(data);
    if buf.len() > cap {
        let excess = buf.len() - cap;
        buf.drain(0..excess);
    }
}

fn push_capped_str(buf: &mut String, data: &str, cap: usize) {
    buf.push_str(data);
    if buf.len() > cap {
        let excess = buf.len() - cap;
        let mut idx = excess;
        while idx < buf.len() && !buf.is_char_boundary(idx) {
            idx += 1;
        }
        buf.drain(0..idx);
    }
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_owned()
    } else {
        text.chars().skip(count - max).collect()
    }
}

/// Run `argv` on `channel`, streaming output through the standard pipeline,
/// cooperatively stopping it if `cancel` fires. Rejects with
/// [`ErrorCode::CommandExit`] when the child exits non-zero and
/// `allow_non_zero` is false.
pub async fn run_command(
    channel: &Arc<Channel>,
    cancel: &CancellationToken,
    argv: &[String],
    cwd: &Path,
    env: &HashMap<String, String>,
    allow_non_zero: bool,
) -> anyhow::Result<CommandOutcome> {
    let mut output_rx = channel.subscribe_output();
    let mut lifecycle_rx = channel.subscribe_lifecycle();

    channel.spawn(argv, cwd, env).await?;

    let mut raw = Vec::new();
    let mut plain = String::new();
    let (code, signal) = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                channel.stop().await;
            }
            out = output_rx.recv() => {
                match out {
                    Ok(bytes) => {
                        push_capped_bytes(&mut raw, &bytes, MAX_CAPTURE_BYTES);
                        let stripped = dashboard_core::ansi::strip(&bytes);
                        push_capped_str(&mut plain, &stripped, MAX_CAPTURE_BYTES);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {}
                }
            }
            lifecycle = lifecycle_rx.recv() => {
                if let Ok(LifecycleEvent::Exit { code, signal }) = lifecycle {
                    break (code, signal);
                }
            }
        }
    };

    let outcome = CommandOutcome { code, signal, raw, plain };
    if !allow_non_zero && code != Some(0) {
        return Err(ServiceError::new(
            ErrorCode::CommandExit,
            format!("command exited {code:?}: {}", tail_chars(&outcome.plain, 5000)),
        )
        .into());
    }
    Ok(outcome)
}

/// Run a CLI binary in non-interactive "exec" mode: same channel pipeline,
/// but the caller supplies the full argv (binary + sandbox-bypass flags +
/// the prompt) built by [`crate::prompts`].
pub async fn run_cli_exec(
    channel: &Arc<Channel>,
    cancel: &CancellationToken,
    argv: &[String],
    cwd: &Path,
    env: &HashMap<String, String>,
) -> anyhow::Result<CommandOutcome> {
    run_command(channel, cancel, argv, cwd, env, false).await
}

/// Run a shell command line via `/bin/bash -lc <cmd>` (§4.10 `test_verify`).
pub async fn run_shell(
    channel: &Arc<Channel>,
    cancel: &CancellationToken,
    command: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
    allow_non_zero: bool,
) -> anyhow::Result<CommandOutcome> {
    let argv = vec!["/bin/bash".to_owned(), "-lc".to_owned(), command.to_owned()];
    run_command(channel, cancel, &argv, cwd, env, allow_non_zero).await
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
