// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narration: extract output since the last persona prompt, summarize it
//! (LLM or a deterministic local fallback), and optionally synthesize
//! audio (§4.8).

use std::path::Path;
use std::sync::Arc;

use dashboard_core::error::{ErrorCode, ServiceError};
use dashboard_core::llm::LlmClient;
use dashboard_core::tts::TtsClient;
use serde::Serialize;
use tracing::warn;

use crate::persona::{default_persona, Persona};
use crate::provider::Provider;

/// Keep at most this many audio files per provider prefix (§4.8 side
/// effect).
pub const MAX_AUDIO_FILES_PER_PROVIDER: usize = 60;
/// Segment text is truncated to this many trailing characters before
/// summarization (§4.8).
pub const MAX_EXTRACT_CHARS: usize = 14_000;
/// Minimum summary length before audio synthesis is attempted (§4.8).
const MIN_AUDIO_CHARS: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub mime: &'static str,
    pub voice: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationResult {
    pub persona_id: String,
    pub persona_name: String,
    pub summary_text: String,
    pub playlist: Vec<PlaylistEntry>,
}

/// Join + normalize the segments captured since `seq_before` (§4.8
/// provider extraction). Fails with [`ErrorCode::NoCapturedOutput`] if
/// nothing was captured.
pub fn normalize_extract(raw_segments: &[(u64, i64, String)]) -> anyhow::Result<String> {
    if raw_segments.is_empty() {
        return Err(ServiceError::new(ErrorCode::NoCapturedOutput, "no output captured since last prompt").into());
    }
    let joined = raw_segments.iter().map(|(_, _, text)| text.as_str()).collect::<Vec<_>>().join("");
    let normalized = normalize_text(&joined);
    if normalized.trim().is_empty() {
        return Err(ServiceError::new(ErrorCode::NoCapturedOutput, "no output captured since last prompt").into());
    }
    Ok(tail_chars(normalized.trim(), MAX_EXTRACT_CHARS))
}

fn normalize_text(text: &str) -> String {
    let cr_to_lf: String = text.chars().map(|c| if c == '\r' { '\n' } else { c }).collect();
    collapse_blank_runs(&cr_to_lf)
}

/// Collapse runs of 3+ consecutive newlines down to exactly 2.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_owned()
    } else {
        text.chars().skip(count - max).collect()
    }
}

/// Deterministic local summary used when no LLM is configured (§4.8).
pub fn deterministic_summary(source: &str) -> String {
    const DECORATION_CHARS: &[char] = &['$', '>', '#', '%', '[', ']', '(', ')', '{', '}'];

    let bullets: Vec<String> = source
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed.chars().count() >= 2 && !trimmed.chars().all(|c| DECORATION_CHARS.contains(&c) || c.is_whitespace())
        })
        .map(|line| format!("- {}", crate::hints::truncate_chars(line.trim(), 220)))
        .take(8)
        .collect();

    if bullets.is_empty() {
        let collapsed: String = source.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("- {}", crate::hints::truncate_chars(&collapsed, 600))
    } else {
        bullets.join("\n")
    }
}

fn llm_summary_prompt(persona: &Persona, source: &str) -> String {
    format!(
        "Summarize the following terminal output as 4-8 concise bullet points.\n\
         Do not invent facts that are not present in the text.\n\
         Write in the voice of this persona style guide: {}\n\n\
         Text:\n{}",
        persona.personality, source
    )
}

/// Resolve which persona narrates: explicit override wins, else the
/// marker's persona, else the default persona list head (§4.8).
pub fn resolve_persona<'a>(
    personas: &'a [Persona],
    override_id: Option<&str>,
    marker_persona_id: Option<&str>,
) -> Option<&'a Persona> {
    if let Some(id) = override_id {
        if let Some(p) = personas.iter().find(|p| p.id == id) {
            return Some(p);
        }
    }
    if let Some(id) = marker_persona_id {
        if let Some(p) = personas.iter().find(|p| p.id == id) {
            return Some(p);
        }
    }
    default_persona(personas)
}

/// Summarize `source` using `llm` when configured, falling back to the
/// deterministic local summary otherwise (§4.8).
pub async fn summarize(llm: Option<&Arc<dyn LlmClient>>, persona: &Persona, source: &str) -> String {
    if let Some(llm) = llm {
        let prompt = llm_summary_prompt(persona, source);
        match llm.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => return text.trim().to_owned(),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "llm summarization failed, falling back to deterministic summary"),
        }
    }
    deterministic_summary(source)
}

/// Synthesize audio for `summary` when a TTS client and a voice id are
/// configured and the summary is long enough (§4.8). Failures are
/// swallowed; the caller still gets the text summary.
pub async fn synthesize_audio(
    tts: Option<&Arc<dyn TtsClient>>,
    voice_id: &str,
    title: &str,
    summary: &str,
    file_prefix: &str,
) -> Vec<PlaylistEntry> {
    if summary.chars().count() < MIN_AUDIO_CHARS || voice_id.is_empty() {
        return Vec::new();
    }
    let Some(tts) = tts else { return Vec::new() };
    match tts.synthesize(summary, voice_id, file_prefix).await {
        Ok(url) => vec![PlaylistEntry {
            title: title.to_owned(),
            url,
            mime: "audio/mpeg",
            voice: voice_id.to_owned(),
        }],
        Err(e) => {
            warn!(error = %e, "tts synthesis failed, returning summary without audio");
            Vec::new()
        }
    }
}

/// Run the full provider-flavored narration pipeline end to end (§4.8):
/// precondition checks, extraction, persona resolution, summarization,
/// optional audio, and audio pruning.
pub async fn narrate_provider(
    provider: &Arc<Provider>,
    personas: &[Persona],
    llm: Option<&Arc<dyn LlmClient>>,
    tts: Option<&Arc<dyn TtsClient>>,
    audio_dir: &Path,
    override_persona_id: Option<&str>,
) -> anyhow::Result<NarrationResult> {
    let marker = provider
        .last_composer_interaction
        .read()
        .await
        .clone()
        .ok_or_else(|| ServiceError::new(ErrorCode::NoComposerInteraction, "no persona prompt has been sent yet"))?;

    let raw = provider.main.segments_since(marker.seq_before).await;
    let extracted = normalize_extract(&raw)?;

    let persona = resolve_persona(personas, override_persona_id, Some(&marker.persona.id))
        .ok_or_else(|| anyhow::anyhow!("no personas configured"))?;

    let summary_text = summarize(llm, persona, &extracted).await;
    let file_prefix = format!("cli-{}", provider.id.as_str());
    let playlist = synthesize_audio(
        tts,
        &persona.voice_id,
        &format!("{} narration", provider.id.title()),
        &summary_text,
        &file_prefix,
    )
    .await;

    if !playlist.is_empty() {
        prune_audio_files(audio_dir, provider.id.as_str(), MAX_AUDIO_FILES_PER_PROVIDER);
    }

    Ok(NarrationResult {
        persona_id: persona.id.clone(),
        persona_name: persona.name.clone(),
        summary_text,
        playlist,
    })
}

/// Narrate a run's already-finalized summary text with no extraction
/// step (§4.8 harness flavor).
pub async fn narrate_summary_text(
    summary_text: &str,
    personas: &[Persona],
    llm: Option<&Arc<dyn LlmClient>>,
    tts: Option<&Arc<dyn TtsClient>>,
    override_persona_id: Option<&str>,
    title: &str,
) -> anyhow::Result<NarrationResult> {
    let persona =
        resolve_persona(personas, override_persona_id, None).ok_or_else(|| anyhow::anyhow!("no personas configured"))?;
    let summary = summarize(llm, persona, summary_text).await;
    let playlist = synthesize_audio(tts, &persona.voice_id, title, &summary, "harness").await;
    Ok(NarrationResult {
        persona_id: persona.id.clone(),
        persona_name: persona.name.clone(),
        summary_text: summary,
        playlist,
    })
}

/// Delete the oldest `cli-<prefix>-*` audio files beyond `keep`, ranked
/// by modification time (§4.8 side effect). Best-effort; any stat/remove
/// failure is swallowed.
fn prune_audio_files(audio_dir: &Path, prefix: &str, keep: usize) {
    let pattern = format!("cli-{prefix}-");
    let Ok(entries) = std::fs::read_dir(audio_dir) else { return };

    let mut files: Vec<(std::time::SystemTime, std::path::PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&pattern))
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            let modified = meta.modified().ok()?;
            Some((modified, e.path()))
        })
        .collect();

    if files.len() <= keep {
        return;
    }
    files.sort_by_key(|(modified, _)| *modified);
    let to_remove = files.len() - keep;
    for (_, path) in files.into_iter().take(to_remove) {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(error = %e, path = %path.display(), "failed to prune stale audio file");
        }
    }
}

#[cfg(test)]
#[path = "narrator_tests.rs"]
mod tests;
