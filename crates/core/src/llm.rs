// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound LLM client: a single call, prompt in, text out. A real
//! provider is not specified; this is a thin `reqwest`-based client
//! against a generic chat-completions-shaped endpoint.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Abstraction over "send a prompt, get text back" so the persona
/// narrator can be tested without a live network dependency. Shaped like
/// [`crate::pty::Backend`] (a manually boxed future) rather than an
/// `async fn` in trait, so it stays usable as `Arc<dyn LlmClient>`.
pub trait LlmClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

/// `reqwest`-backed implementation calling a chat-completions-shaped
/// endpoint with a bearer token.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }

    async fn complete_inner(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "messages": [{ "role": "user", "content": prompt }],
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: serde_json::Value = resp.json().await?;
        let text = parsed["choices"][0]["message"]["content"].as_str().unwrap_or("").to_owned();
        Ok(text)
    }
}

impl LlmClient for HttpLlmClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.complete_inner(prompt))
    }
}
