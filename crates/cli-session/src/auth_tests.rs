// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::provider::ProviderId;

#[test]
fn codex_keyword_logged_in() {
    let status = parse_status(ProviderId::Codex, Some("You are logged in as dev@example.com"));
    assert_eq!(status.state, AuthState::LoggedIn);
}

#[test]
fn codex_keyword_logged_out() {
    let status = parse_status(ProviderId::Codex, Some("You are NOT LOGGED IN."));
    assert_eq!(status.state, AuthState::LoggedOut);
}

#[test]
fn codex_unknown_on_unrecognized_output() {
    let status = parse_status(ProviderId::Codex, Some("unexpected garble"));
    assert_eq!(status.state, AuthState::Unknown);
}

#[test]
fn claude_json_logged_in_with_email() {
    let body = r#"{"loggedIn": true, "email": "me@example.com"}"#;
    let status = parse_status(ProviderId::Claude, Some(body));
    assert_eq!(status.state, AuthState::LoggedIn);
    assert_eq!(status.detail.as_deref(), Some("Logged in as me@example.com"));
    assert_eq!(status.method, "json");
}

#[test]
fn claude_json_logged_out() {
    let status = parse_status(ProviderId::Claude, Some(r#"{"loggedIn": false}"#));
    assert_eq!(status.state, AuthState::LoggedOut);
}

#[test]
fn claude_falls_back_to_keyword_when_not_json() {
    let status = parse_status(ProviderId::Claude, Some("you are logged in"));
    assert_eq!(status.state, AuthState::LoggedIn);
    assert_eq!(status.method, "keyword");
}

#[test]
fn gemini_always_unknown_best_effort() {
    let status = parse_status(ProviderId::Gemini, Some("anything"));
    assert_eq!(status.state, AuthState::Unknown);
    assert_eq!(status.method, "best-effort");
}

#[test]
fn none_body_is_unknown_subprocess_error() {
    let status = parse_status(ProviderId::Codex, None);
    assert_eq!(status.state, AuthState::Unknown);
    assert_eq!(status.method, "subprocess-error");
}

#[tokio::test]
async fn run_subcommand_captures_stdout_and_stderr() {
    let argv = vec![
        "/bin/sh".to_owned(),
        "-c".to_owned(),
        "echo out-line; echo err-line 1>&2".to_owned(),
    ];
    let out = run_subcommand(&argv, std::path::Path::new("/tmp")).await.expect("output");
    assert!(out.contains("out-line"));
    assert!(out.contains("err-line"));
}

#[tokio::test]
async fn run_subcommand_returns_none_on_spawn_failure() {
    let argv = vec!["/no/such/binary-xyz".to_owned()];
    assert!(run_subcommand(&argv, std::path::Path::new("/tmp")).await.is_none());
}
