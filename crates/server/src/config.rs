// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI configuration for the `dashboard-api` binary (§3.6, §6.1).

use std::path::PathBuf;

use clap::Parser;

/// HTTP + WebSocket API for the interactive CLI session service and the
/// harness orchestrator.
#[derive(Debug, Clone, Parser)]
#[command(name = "dashboard-api", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "DASHBOARD_API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "DASHBOARD_API_PORT", default_value = "8080")]
    pub port: u16,

    /// Root directory for transcripts, run snapshots, artifacts and audio.
    /// Defaults to `$HOME/.dashboard-api`.
    #[arg(long, env = "DASHBOARD_API_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Allowlisted root harness task inputs must resolve inside.
    /// Defaults to `$HOME/shared-repos`.
    #[arg(long, env = "DASHBOARD_API_SHARED_REPOS_ROOT")]
    pub shared_repos_root: Option<PathBuf>,

    /// Root under which per-run worktrees are created. Defaults to
    /// `<data_dir>/harness/workspaces`.
    #[arg(long, env = "DASHBOARD_API_HARNESS_WORKSPACE")]
    pub harness_workspace: Option<PathBuf>,

    /// Path to the secrets env-file (§6.1). Defaults to
    /// `$HOME/.pi5-dashboard.keys.env`.
    #[arg(long, env = "DASHBOARD_API_ENV_PATH")]
    pub env_path: Option<PathBuf>,

    /// Git remote name used by the harness's `finalize_commit_push` stage.
    #[arg(long, env = "DASHBOARD_API_GIT_REMOTE", default_value = "origin")]
    pub git_remote: String,

    /// LLM API key. Falls back to `LLM_API_KEY` in the env-file if unset.
    #[arg(long, env = "DASHBOARD_API_LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// LLM base URL. Falls back to `LLM_BASE_URL` in the env-file if unset.
    #[arg(long, env = "DASHBOARD_API_LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// TTS API key. Falls back to `TTS_API_KEY` in the env-file if unset.
    #[arg(long, env = "DASHBOARD_API_TTS_API_KEY")]
    pub tts_api_key: Option<String>,

    /// TTS base URL. Falls back to `TTS_BASE_URL` in the env-file if unset.
    #[arg(long, env = "DASHBOARD_API_TTS_BASE_URL")]
    pub tts_base_url: Option<String>,

    /// Log format (json or text).
    #[arg(long, env = "DASHBOARD_API_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "DASHBOARD_API_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| home_dir().join(".dashboard-api"))
    }

    pub fn resolved_shared_repos_root(&self) -> PathBuf {
        self.shared_repos_root.clone().unwrap_or_else(|| home_dir().join("shared-repos"))
    }

    pub fn resolved_harness_workspace(&self, data_dir: &std::path::Path) -> PathBuf {
        self.harness_workspace.clone().unwrap_or_else(|| data_dir.join("harness").join("workspaces"))
    }

    pub fn resolved_env_path(&self) -> PathBuf {
        self.env_path.clone().unwrap_or_else(|| home_dir().join(".pi5-dashboard.keys.env"))
    }

    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
