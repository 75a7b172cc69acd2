// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level application state: the provider registry, the harness
//! registry, shared LLM/TTS clients, and the auth-hint fan-out channels —
//! everything an HTTP or WebSocket handler needs, reached via
//! `State<Arc<AppState>>` (mirrors `coop`'s `Store`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashboard_cli_session::{Persona, ProviderId, ProviderRegistry};
use dashboard_core::llm::{HttpLlmClient, LlmClient};
use dashboard_core::tts::{HttpTtsClient, TtsClient};
use dashboard_core::ws::ServerMessage;
use dashboard_harness::{HarnessConfig, HarnessRegistry};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::personas;

/// Broadcast capacity for `auth_hint` fan-out per provider (§4.6).
const AUTH_HINT_CAP: usize = 32;

pub struct AppState {
    pub config: Config,
    pub data_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub providers: Arc<ProviderRegistry>,
    pub harness: Arc<HarnessRegistry>,
    pub personas: Vec<Persona>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub tts: Option<Arc<dyn TtsClient>>,
    pub auth_hints: HashMap<ProviderId, broadcast::Sender<ServerMessage>>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub async fn build(config: Config) -> anyhow::Result<Arc<Self>> {
        let data_dir = config.resolved_data_dir();
        let shared_repos_root = config.resolved_shared_repos_root();
        let harness_workspace = config.resolved_harness_workspace(&data_dir);
        let env_path = config.resolved_env_path();

        for dir in [
            &data_dir,
            &data_dir.join("ai-cli").join("transcripts"),
            &data_dir.join("ai-cli").join("metadata"),
            &data_dir.join("harness").join("runs"),
            &data_dir.join("harness").join("artifacts"),
            &data_dir.join("audio"),
            &shared_repos_root,
            &harness_workspace,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }

        let secrets = dashboard_core::envstore::load(&env_path).unwrap_or_default();
        let llm_api_key = config.llm_api_key.clone().or_else(|| secrets.get("LLM_API_KEY").cloned());
        let llm_base_url = config.llm_base_url.clone().or_else(|| secrets.get("LLM_BASE_URL").cloned());
        let tts_api_key = config.tts_api_key.clone().or_else(|| secrets.get("TTS_API_KEY").cloned());
        let tts_base_url = config.tts_base_url.clone().or_else(|| secrets.get("TTS_BASE_URL").cloned());

        let audio_dir = data_dir.join("audio");

        let llm: Option<Arc<dyn LlmClient>> = match (llm_api_key, llm_base_url) {
            (Some(key), Some(url)) if !key.is_empty() && !url.is_empty() => {
                info!("LLM client configured");
                Some(Arc::new(HttpLlmClient::new(url, key)))
            }
            _ => {
                info!("no LLM key/url configured, narration falls back to deterministic summaries");
                None
            }
        };
        let tts: Option<Arc<dyn TtsClient>> = match (tts_api_key, tts_base_url) {
            (Some(key), Some(url)) if !key.is_empty() && !url.is_empty() => {
                info!("TTS client configured");
                Some(Arc::new(HttpTtsClient::new(url, key, audio_dir.clone())))
            }
            _ => {
                info!("no TTS key/url configured, narration returns text only");
                None
            }
        };

        let seeds = personas::load(&data_dir);
        let session_personas = personas::to_cli_session(&seeds);
        let harness_personas = personas::to_harness_spec(&seeds);

        let transcripts_dir = data_dir.join("ai-cli").join("transcripts");
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let providers = Arc::new(ProviderRegistry::new(|_id| home.clone(), transcripts_dir, session_personas.clone()));

        let harness_config = HarnessConfig {
            shared_repos_root,
            workspace_root: harness_workspace,
            artifacts_root: data_dir.join("harness").join("artifacts"),
            runs_root: data_dir.join("harness").join("runs"),
            transcripts_root: data_dir.join("ai-cli").join("transcripts"),
            remote: config.git_remote.clone(),
        };
        let harness = HarnessRegistry::new(harness_config, harness_personas, llm.clone(), tts.clone());

        let auth_hints = spawn_auth_hint_watchers(&providers);

        Ok(Arc::new(Self {
            config,
            data_dir,
            audio_dir,
            providers,
            harness,
            personas: session_personas,
            llm,
            tts,
            auth_hints,
            shutdown: CancellationToken::new(),
        }))
    }
}

/// Spawn one background task per provider that scans the `auth` channel's
/// raw output for login URLs / device codes (§4.6) and republishes hits
/// on a per-provider broadcast channel that WebSocket connections with
/// `channel=auth` subscribe to.
fn spawn_auth_hint_watchers(
    providers: &Arc<ProviderRegistry>,
) -> HashMap<ProviderId, broadcast::Sender<ServerMessage>> {
    let mut out = HashMap::new();
    for id in ProviderId::ALL {
        let (tx, _) = broadcast::channel(AUTH_HINT_CAP);
        if let Ok(provider) = providers.get(id) {
            let mut output_rx = provider.auth.subscribe_output();
            let tx_clone = tx.clone();
            tokio::spawn(async move {
                loop {
                    match output_rx.recv().await {
                        Ok(bytes) => {
                            let text = String::from_utf8_lossy(&bytes);
                            if let Some(hint) = dashboard_cli_session::hints::extract(&text) {
                                let msg = ServerMessage::AuthHint {
                                    url: hint.url,
                                    code: hint.code,
                                    text: dashboard_cli_session::hints::preview(&text),
                                };
                                let _ = tx_clone.send(msg);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        } else {
            warn!(provider = id.as_str(), "failed to resolve provider for auth-hint watcher");
        }
        out.insert(id, tx);
    }
    out
}
