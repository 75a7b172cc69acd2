// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: build a real [`AppState`] rooted at a temp
//! `data_dir` so handler tests exercise the actual provider/harness
//! registries without touching the developer's home directory.

use std::sync::Arc;

use crate::config::Config;
use crate::state::AppState;

/// Extension trait to convert any `Display` error into `anyhow::Error`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

fn test_config(data_dir: &std::path::Path) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        data_dir: Some(data_dir.join("data")),
        shared_repos_root: Some(data_dir.join("shared-repos")),
        harness_workspace: Some(data_dir.join("workspaces")),
        env_path: Some(data_dir.join("keys.env")),
        git_remote: "origin".into(),
        llm_api_key: None,
        llm_base_url: None,
        tts_api_key: None,
        tts_base_url: None,
        log_format: "text".into(),
        log_level: "error".into(),
    }
}

/// Build a real `AppState` rooted at a fresh temp directory. The
/// `TempDir` guard must be kept alive for as long as `AppState` is used.
pub async fn build_test_state() -> anyhow::Result<(Arc<AppState>, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let state = AppState::build(config).await?;
    Ok((state, dir))
}
