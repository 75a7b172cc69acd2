// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous auth status subcommand execution and output parsing
//! (§4.5), plus the auth-hint scanner that runs over every chunk emitted
//! to an `auth` subchannel (§4.6, factored into `hints.rs`).

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::provider::{AuthState, AuthStatus, ProviderId};

/// Hard timeout on the status subcommand per §5.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(12);

/// Run `argv` in `cwd`, merging stdout+stderr, bounded by
/// [`STATUS_TIMEOUT`]. Returns `None` on spawn failure or timeout; the
/// caller treats that the same as an inconclusive status.
pub async fn run_subcommand(argv: &[String], cwd: &Path) -> Option<String> {
    if argv.is_empty() {
        return None;
    }
    let mut cmd = tokio::process::Command::new(&argv[0]);
    cmd.args(&argv[1..]).current_dir(cwd).kill_on_drop(true);

    let output = tokio::time::timeout(STATUS_TIMEOUT, cmd.output()).await;
    match output {
        Ok(Ok(out)) => {
            let mut merged = String::from_utf8_lossy(&out.stdout).into_owned();
            merged.push('\n');
            merged.push_str(&String::from_utf8_lossy(&out.stderr));
            Some(merged)
        }
        Ok(Err(e)) => {
            warn!(error = %e, argv = ?argv, "auth subcommand failed to spawn");
            None
        }
        Err(_) => {
            warn!(argv = ?argv, "auth subcommand timed out");
            None
        }
    }
}

/// Parse a merged stdout+stderr body per provider (§4.5).
pub fn parse_status(id: ProviderId, body: Option<&str>) -> AuthStatus {
    let checked_at = Some(now_unix_ms());
    let Some(body) = body else {
        return AuthStatus { state: AuthState::Unknown, detail: None, checked_at, method: "subprocess-error" };
    };

    match id {
        ProviderId::Codex => parse_keyword_status(body, checked_at),
        ProviderId::Claude => parse_json_then_keyword_status(body, checked_at),
        ProviderId::Gemini => {
            AuthStatus { state: AuthState::Unknown, detail: None, checked_at, method: "best-effort" }
        }
    }
}

fn parse_keyword_status(body: &str, checked_at: Option<i64>) -> AuthStatus {
    let lower = body.to_lowercase();
    if lower.contains("not logged in") {
        AuthStatus { state: AuthState::LoggedOut, detail: Some(body.trim().to_owned()), checked_at, method: "keyword" }
    } else if lower.contains("logged in") {
        AuthStatus { state: AuthState::LoggedIn, detail: Some(body.trim().to_owned()), checked_at, method: "keyword" }
    } else {
        AuthStatus { state: AuthState::Unknown, detail: Some(body.trim().to_owned()), checked_at, method: "keyword" }
    }
}

fn parse_json_then_keyword_status(body: &str, checked_at: Option<i64>) -> AuthStatus {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(logged_in) = value.get("loggedIn").and_then(|v| v.as_bool()) {
            let email = value.get("email").and_then(|v| v.as_str());
            let detail = match (logged_in, email) {
                (true, Some(email)) => Some(format!("Logged in as {email}")),
                (true, None) => Some("Logged in".to_owned()),
                (false, _) => Some("Not logged in".to_owned()),
            };
            let state = if logged_in { AuthState::LoggedIn } else { AuthState::LoggedOut };
            return AuthStatus { state, detail, checked_at, method: "json" };
        }
    }
    parse_keyword_status(body, checked_at)
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
