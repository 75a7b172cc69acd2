// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `dashboard-api` binary as a subprocess and exercises
//! it over HTTP and WebSocket, each run isolated under its own temp
//! `data_dir`/`shared_repos_root` so specs never touch a developer's
//! real home directory or `.dashboard-api` state.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Resolve the path to the compiled `dashboard-api` binary.
pub fn dashboard_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("dashboard-api")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `dashboard-api` process that is killed on drop. Owns the
/// temp directories it was pointed at so they outlive the child.
pub struct DashboardProcess {
    child: Child,
    port: u16,
    _data_dir: tempfile::TempDir,
    _shared_repos_root: tempfile::TempDir,
}

/// Builder for configuring a [`DashboardProcess`] before spawning it.
pub struct DashboardBuilder {
    log_level: String,
    git_remote: String,
}

impl Default for DashboardBuilder {
    fn default() -> Self {
        Self { log_level: "warn".into(), git_remote: "origin".into() }
    }
}

impl DashboardBuilder {
    /// Override the log level passed via `--log-level`.
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_owned();
        self
    }

    /// Override the git remote passed via `--git-remote`.
    pub fn git_remote(mut self, remote: &str) -> Self {
        self.git_remote = remote.to_owned();
        self
    }

    /// Spawn `dashboard-api` with the configured options.
    pub fn spawn(self) -> anyhow::Result<DashboardProcess> {
        let binary = dashboard_binary();
        anyhow::ensure!(binary.exists(), "dashboard-api binary not found at {}", binary.display());

        let port = free_port()?;
        let data_dir = tempfile::tempdir()?;
        let shared_repos_root = tempfile::tempdir()?;

        let child = Command::new(&binary)
            .args([
                "--host",
                "127.0.0.1",
                "--port",
                &port.to_string(),
                "--data-dir",
                &data_dir.path().to_string_lossy(),
                "--shared-repos-root",
                &shared_repos_root.path().to_string_lossy(),
                "--git-remote",
                &self.git_remote,
                "--log-format",
                "text",
                "--log-level",
                &self.log_level,
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(DashboardProcess { child, port, _data_dir: data_dir, _shared_repos_root: shared_repos_root })
    }
}

impl DashboardProcess {
    /// Create a builder for custom startup configuration.
    pub fn build() -> DashboardBuilder {
        DashboardBuilder::default()
    }

    /// Spawn `dashboard-api` with defaults.
    pub fn start() -> anyhow::Result<Self> {
        Self::build().spawn()
    }

    /// The bound HTTP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for HTTP requests.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// WebSocket base URL, without the resource path or query string.
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Poll `/api/v1/health` until it answers or `timeout` elapses.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("dashboard-api did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(&mut self, timeout: Duration) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("dashboard-api did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for DashboardProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
