// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact store (§4.12): every file a run produces lives under
//! `<harnessArtifacts>/<runId>/` and is only ever addressed by a short id
//! plus a path that is re-checked against that root on every access.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dashboard_core::pathguard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Text,
    Json,
    Image,
    File,
}

/// `{id, name, relPath, type, mime, size, createdAt, description}` (§4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub id: String,
    pub name: String,
    pub rel_path: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub mime: String,
    pub size: Option<u64>,
    pub created_at: i64,
    pub description: Option<String>,
}

/// Infer a content type from a file suffix; falls back to
/// `application/octet-stream`.
pub fn mime_for(rel_path: &str) -> &'static str {
    let lower = rel_path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        "application/json"
    } else if lower.ends_with(".md") {
        "text/markdown"
    } else if lower.ends_with(".txt") {
        "text/plain"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".log") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

/// Per-run artifact root. Every write/read resolves `rel_path` against
/// this root via [`pathguard::contain_lexical`]; any path that would
/// escape it fails with [`dashboard_core::error::ErrorCode::PathEscape`].
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel_path: &str) -> anyhow::Result<PathBuf> {
        pathguard::contain_lexical(&self.root, Path::new(rel_path))
    }

    async fn ensure_parent(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    pub async fn write_text(&self, rel_path: &str, contents: &str) -> anyhow::Result<u64> {
        let path = self.resolve(rel_path)?;
        self.ensure_parent(&path).await?;
        tokio::fs::write(&path, contents.as_bytes()).await?;
        Ok(contents.len() as u64)
    }

    pub async fn write_json(&self, rel_path: &str, value: &serde_json::Value) -> anyhow::Result<u64> {
        let rendered = serde_json::to_string_pretty(value)?;
        self.write_text(rel_path, &rendered).await
    }

    pub async fn write_bytes(&self, rel_path: &str, data: &[u8]) -> anyhow::Result<u64> {
        let path = self.resolve(rel_path)?;
        self.ensure_parent(&path).await?;
        tokio::fs::write(&path, data).await?;
        Ok(data.len() as u64)
    }

    /// Copy an existing file on disk into the artifact tree (used when a
    /// stage already produced a file, e.g. a browser screenshot).
    pub async fn copy_from(&self, rel_path: &str, source: &Path) -> anyhow::Result<u64> {
        let path = self.resolve(rel_path)?;
        self.ensure_parent(&path).await?;
        tokio::fs::copy(source, &path).await?;
        let meta = tokio::fs::metadata(&path).await?;
        Ok(meta.len())
    }

    pub async fn read_text(&self, rel_path: &str) -> anyhow::Result<String> {
        let path = self.resolve(rel_path)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn read_bytes(&self, rel_path: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(rel_path)?;
        Ok(tokio::fs::read(path).await?)
    }

    pub async fn stat_len(&self, rel_path: &str) -> Option<u64> {
        let path = self.resolve(rel_path).ok()?;
        tokio::fs::metadata(path).await.ok().map(|m| m.len())
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
