// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound TTS client: text + voice in, an audio URL/path out.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Abstraction over "synthesize speech", tested without a live network
/// dependency by leaving it unconfigured (`None`) in the narrator. Shaped
/// like [`crate::llm::LlmClient`] (a manually boxed future) so it stays
/// usable as `Arc<dyn TtsClient>`.
pub trait TtsClient: Send + Sync {
    /// `prefix` names the caller (e.g. `cli-codex`, `harness`) and
    /// becomes the leading component of the saved filename per §6.4's
    /// `audio/<prefix>-<epoch>-<rand>.mp3` layout.
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice: &'a str,
        prefix: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

/// `reqwest`-backed implementation calling a generic TTS endpoint and
/// saving the resulting audio bytes under `audio_dir`.
pub struct HttpTtsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    audio_dir: std::path::PathBuf,
}

impl HttpTtsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        audio_dir: std::path::PathBuf,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client, base_url: base_url.into(), api_key: api_key.into(), audio_dir }
    }

    async fn synthesize_inner(&self, text: &str, voice: &str, prefix: &str) -> anyhow::Result<String> {
        let url = format!("{}/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "input": text, "voice": voice });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;

        std::fs::create_dir_all(&self.audio_dir)?;
        let epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let rand_suffix: u32 = rand::random();
        let filename = format!("{prefix}-{epoch}-{rand_suffix:08x}.mp3");
        let path = self.audio_dir.join(&filename);
        std::fs::write(&path, &bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

impl TtsClient for HttpTtsClient {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice: &'a str,
        prefix: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.synthesize_inner(text, voice, prefix))
    }
}
