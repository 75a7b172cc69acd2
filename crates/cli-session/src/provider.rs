// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider registry: a fixed set of three CLI assistants, each composed
//! from the shared PTY primitives in `dashboard-core`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashboard_core::error::{ErrorCode, ServiceError};
use dashboard_core::pty::supervisor::{Channel, Transcript};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::persona::Persona;

/// Ring buffer cap for a provider's interactive `main` channel (§9).
pub const MAIN_RING_CAP: usize = 220_000;
/// Ring buffer cap for the short-lived `auth` subchannel (§9).
pub const AUTH_RING_CAP: usize = 60_000;

/// Closed set of supported providers; fixed at startup per §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Codex,
    Claude,
    Gemini,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Codex, ProviderId::Claude, ProviderId::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "codex" => Some(Self::Codex),
            "claude" => Some(Self::Claude),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// The CLI binary each provider shells out to.
    pub fn binary(&self) -> &'static str {
        self.as_str()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Codex => "Codex",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
        }
    }
}

/// `{login_args, status_args, logout_args, can_status, can_logout}` (§3.2).
#[derive(Debug, Clone)]
pub struct AuthDescriptor {
    pub login_args: Vec<String>,
    pub status_args: Vec<String>,
    pub logout_args: Vec<String>,
    pub can_status: bool,
    pub can_logout: bool,
}

impl AuthDescriptor {
    fn for_provider(id: ProviderId) -> Self {
        match id {
            // Provider A in §4.5: keyword status parsing, supports logout.
            ProviderId::Codex => Self {
                login_args: vec!["login".into()],
                status_args: vec!["login".into(), "status".into()],
                logout_args: vec!["logout".into()],
                can_status: true,
                can_logout: true,
            },
            // Provider B in §4.5: JSON status with a `loggedIn` field.
            ProviderId::Claude => Self {
                login_args: vec!["setup-token".into()],
                status_args: vec!["auth".into(), "status".into(), "--json".into()],
                logout_args: vec!["logout".into()],
                can_status: true,
                can_logout: true,
            },
            // Provider C in §4.5: no status command at all.
            ProviderId::Gemini => Self {
                login_args: vec!["auth".into(), "login".into()],
                status_args: vec![],
                logout_args: vec![],
                can_status: false,
                can_logout: false,
            },
        }
    }
}

/// Auth state machine value (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedIn,
    LoggedOut,
    Unknown,
}

/// `{state, detail, checked_at, method}` (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub state: AuthState,
    pub detail: Option<String>,
    pub checked_at: Option<i64>,
    pub method: &'static str,
}

impl Default for AuthStatus {
    fn default() -> Self {
        Self { state: AuthState::Unknown, detail: None, checked_at: None, method: "unchecked" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaMode {
    Selected,
    Random,
}

/// `{mode, persona_id}` (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaPreference {
    pub mode: PersonaMode,
    pub persona_id: Option<String>,
}

impl Default for PersonaPreference {
    fn default() -> Self {
        Self { mode: PersonaMode::Selected, persona_id: None }
    }
}

/// A persona identity snapshot captured into a [`LastComposerInteraction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSnapshot {
    pub id: String,
    pub name: String,
    pub voice_id: String,
}

/// Marks the `main` channel's output-sequence position just before a
/// persona prompt was written, so the narrator can isolate the reply
/// (§3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastComposerInteraction {
    pub id: String,
    pub timestamp: i64,
    pub seq_before: u64,
    pub persona: PersonaSnapshot,
    pub mode: PersonaMode,
    pub preview: String,
}

/// One CLI assistant: a `main` REPL channel, an `auth` subchannel, and the
/// persisted state the service tracks for it.
pub struct Provider {
    pub id: ProviderId,
    pub workspace: PathBuf,
    pub auth_descriptor: AuthDescriptor,
    pub main: Arc<Channel>,
    pub auth: Arc<Channel>,
    pub auth_status: RwLock<AuthStatus>,
    pub cached_version: RwLock<Option<String>>,
    pub persona_preference: RwLock<PersonaPreference>,
    pub last_composer_interaction: RwLock<Option<LastComposerInteraction>>,
}

impl Provider {
    fn new(id: ProviderId, workspace: PathBuf, transcripts_dir: PathBuf) -> Arc<Self> {
        let main = Channel::new(
            "main",
            MAIN_RING_CAP,
            Transcript::new(transcripts_dir.clone(), id.as_str(), "main"),
            200,
            50,
        );
        let auth = Channel::new(
            "auth",
            AUTH_RING_CAP,
            Transcript::new(transcripts_dir, id.as_str(), "auth"),
            200,
            50,
        );
        Arc::new(Self {
            id,
            workspace,
            auth_descriptor: AuthDescriptor::for_provider(id),
            main,
            auth,
            auth_status: RwLock::new(AuthStatus::default()),
            cached_version: RwLock::new(None),
            persona_preference: RwLock::new(PersonaPreference::default()),
            last_composer_interaction: RwLock::new(None),
        })
    }

    fn main_argv(&self) -> Vec<String> {
        match self.id {
            ProviderId::Codex => vec![],
            ProviderId::Claude => vec![],
            ProviderId::Gemini => vec![],
        }
    }

    fn spawn_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        if let Some(home) = std::env::var_os("HOME") {
            env.insert("HOME".into(), home.to_string_lossy().into_owned());
        }
        env.insert("TERM".into(), "xterm-256color".into());
        env
    }

    /// Idempotent spawn of the `main` channel (§4.5).
    pub async fn ensure_main(self: &Arc<Self>) -> anyhow::Result<Arc<Channel>> {
        if !self.main.is_running() {
            let argv = self.main_argv();
            let mut full_argv = vec![self.id.binary().to_owned()];
            full_argv.extend(argv);
            self.main.spawn(&full_argv, &self.workspace, &self.spawn_env()).await?;
            info!(provider = self.id.as_str(), "main channel spawned");
        }
        Ok(Arc::clone(&self.main))
    }

    /// Spawn the `auth` subchannel. Only `mode == "login"` is accepted;
    /// any other mode fails with [`ErrorCode::UnsupportedAuthMode`] (§4.5).
    pub async fn start_auth(self: &Arc<Self>, mode: &str) -> anyhow::Result<Arc<Channel>> {
        if mode != "login" {
            return Err(ServiceError::new(
                ErrorCode::UnsupportedAuthMode,
                format!("unsupported auth mode: {mode}"),
            )
            .into());
        }
        if !self.auth.is_running() {
            let mut full_argv = vec![self.id.binary().to_owned()];
            full_argv.extend(self.auth_descriptor.login_args.clone());
            self.auth.spawn(&full_argv, &self.workspace, &self.spawn_env()).await?;
            info!(provider = self.id.as_str(), "auth channel spawned (login)");
        }
        Ok(Arc::clone(&self.auth))
    }

    /// Stop a named channel via the SIGTERM/SIGKILL protocol (§4.3).
    pub async fn stop(&self, channel: &Arc<Channel>) {
        channel.stop().await;
    }

    /// Run the logout subcommand synchronously, then refresh auth status.
    /// Fails with [`ErrorCode::UnsupportedAuthMode`] when the provider
    /// doesn't support logout.
    pub async fn logout(&self) -> anyhow::Result<AuthStatus> {
        if !self.auth_descriptor.can_logout {
            return Err(ServiceError::new(
                ErrorCode::UnsupportedAuthMode,
                format!("{} does not support logout", self.id.as_str()),
            )
            .into());
        }
        let mut argv = vec![self.id.binary().to_owned()];
        argv.extend(self.auth_descriptor.logout_args.clone());
        let _ = crate::auth::run_subcommand(&argv, &self.workspace).await;
        self.refresh_auth_status().await
    }

    /// Synchronously run the status subcommand (timeout <= 12s), parse it
    /// per provider, and persist + broadcast the result (§4.5).
    pub async fn refresh_auth_status(&self) -> anyhow::Result<AuthStatus> {
        let status = if self.auth_descriptor.can_status {
            let mut argv = vec![self.id.binary().to_owned()];
            argv.extend(self.auth_descriptor.status_args.clone());
            let output = crate::auth::run_subcommand(&argv, &self.workspace).await;
            crate::auth::parse_status(self.id, output.as_deref())
        } else {
            AuthStatus { state: AuthState::Unknown, detail: None, checked_at: Some(now_unix_ms()), method: "best-effort" }
        };
        *self.auth_status.write().await = status.clone();

        let snapshot = self.snapshot().await;
        self.main.broadcast_state(snapshot.clone());
        self.auth.broadcast_state(snapshot);
        Ok(status)
    }

    /// Provider snapshot served by `GET /api/ai-cli/session/:provider` and
    /// broadcast as `state` events to both channels' sinks.
    pub async fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "title": self.id.title(),
            "main": {
                "running": self.main.is_running(),
                "size": self.main.size(),
            },
            "auth": {
                "running": self.auth.is_running(),
                "size": self.auth.size(),
            },
            "authStatus": &*self.auth_status.read().await,
            "version": &*self.cached_version.read().await,
            "personaPreference": &*self.persona_preference.read().await,
            "lastComposerInteraction": &*self.last_composer_interaction.read().await,
        })
    }
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The fixed registry of providers, owned by the service (§4.5).
pub struct ProviderRegistry {
    pub providers: HashMap<ProviderId, Arc<Provider>>,
    pub personas: Vec<Persona>,
}

impl ProviderRegistry {
    /// Build the registry. `workspace_for` resolves each provider's cwd
    /// (typically `$HOME`); `transcripts_dir` is the shared directory for
    /// `<provider>-<channel>-YYYYMMDD.jsonl` files (§6.4).
    pub fn new(
        workspace_for: impl Fn(ProviderId) -> PathBuf,
        transcripts_dir: PathBuf,
        personas: Vec<Persona>,
    ) -> Self {
        let mut providers = HashMap::new();
        for id in ProviderId::ALL {
            providers.insert(id, Provider::new(id, workspace_for(id), transcripts_dir.clone()));
        }
        Self { providers, personas }
    }

    pub fn get(&self, id: ProviderId) -> anyhow::Result<Arc<Provider>> {
        self.providers
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::new(ErrorCode::UnknownTarget, "unknown provider").into())
    }

    pub async fn list_summaries(&self) -> Vec<serde_json::Value> {
        let mut out = Vec::with_capacity(self.providers.len());
        for id in ProviderId::ALL {
            if let Some(p) = self.providers.get(&id) {
                out.push(p.snapshot().await);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
