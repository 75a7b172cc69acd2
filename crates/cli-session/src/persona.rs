// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persona selection and prompt composition (§4.7).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashboard_core::error::{ErrorCode, ServiceError};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hints::truncate_chars;
use crate::provider::{
    LastComposerInteraction, PersonaMode, PersonaSnapshot, Provider, ProviderId,
};

/// `{id, name, voiceId, personality}` (§3.3). Loaded once from
/// configuration at service start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub voice_id: String,
    pub personality: String,
}

/// Select a persona per the `(mode, personaId)` rule in §4.7 step 1:
/// `random` picks uniformly from a non-empty list; `selected` looks up
/// the id, falling back to the first persona.
pub fn select<'a>(personas: &'a [Persona], mode: PersonaMode, persona_id: Option<&str>) -> anyhow::Result<&'a Persona> {
    if personas.is_empty() {
        anyhow::bail!("no personas configured");
    }
    match mode {
        PersonaMode::Random => {
            let mut rng = rand::rng();
            #[allow(clippy::expect_used)]
            Ok(personas.choose(&mut rng).expect("non-empty checked above"))
        }
        PersonaMode::Selected => {
            let found = persona_id.and_then(|id| personas.iter().find(|p| p.id == id));
            Ok(found.unwrap_or(&personas[0]))
        }
    }
}

/// Build the persona-framed prompt sent into the PTY (§4.7 step 2).
pub fn build_prompt(persona: &Persona, provider_title: &str, user_text: &str) -> String {
    let mut prompt = format!(
        "Dashboard persona mode ({}) for {}:\n\
         Answer the following request in this persona voice while preserving technical accuracy and actionable detail.\n\
         If writing code or commands, prefer concrete steps and explain assumptions briefly.\n\n",
        persona.name, provider_title
    );
    if !persona.personality.is_empty() {
        prompt.push_str("Persona profile: ");
        prompt.push_str(&persona.personality);
        prompt.push_str("\n\n");
    }
    prompt.push_str("User request:\n");
    prompt.push_str(user_text);
    prompt
}

/// Result of `POST persona/send` (§4.7 step 5).
#[derive(Debug, Clone, Serialize)]
pub struct ComposerResult {
    pub persona: PersonaSnapshot,
    pub preview: String,
}

/// Compose and send a persona-wrapped prompt into a provider's `main`
/// channel, recording a [`LastComposerInteraction`] marker so the
/// narrator can later isolate the reply.
pub async fn send(
    provider: &Arc<Provider>,
    personas: &[Persona],
    mode: PersonaMode,
    persona_id: Option<&str>,
    user_text: &str,
) -> anyhow::Result<ComposerResult> {
    if !provider.main.is_running() {
        return Err(ServiceError::new(ErrorCode::SessionNotRunning, "main channel is not running").into());
    }

    let persona = select(personas, mode, persona_id)?;
    let prompt = build_prompt(persona, provider.id.title(), user_text);

    // Capture the pre-write sequence value before writing anything.
    let seq_before = provider.main.output_seq().await;

    let interaction = LastComposerInteraction {
        id: Uuid::new_v4().to_string(),
        timestamp: now_unix_ms(),
        seq_before,
        persona: PersonaSnapshot {
            id: persona.id.clone(),
            name: persona.name.clone(),
            voice_id: persona.voice_id.clone(),
        },
        mode,
        preview: truncate_chars(user_text, 200),
    };
    *provider.last_composer_interaction.write().await = Some(interaction.clone());

    let mut payload = prompt.into_bytes();
    payload.push(b'\r');
    provider.main.write(&payload).await?;

    let snapshot = provider.snapshot().await;
    provider.main.broadcast_state(snapshot);

    Ok(ComposerResult { persona: interaction.persona, preview: interaction.preview })
}

/// Resolve the default persona list head, used when no explicit or
/// marker-carried persona is available (§4.8 persona resolution).
pub fn default_persona(personas: &[Persona]) -> Option<&Persona> {
    personas.first()
}

/// Parse a provider id out of a loose string, used by HTTP handlers.
pub fn parse_provider_id(s: &str) -> Option<ProviderId> {
    ProviderId::parse(s)
}

fn now_unix_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
#[path = "persona_tests.rs"]
mod tests;
