// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persona selection for the harness (§4.10 `init`). Mirrors
//! `dashboard_cli_session::persona::select`'s selection rule; duplicated
//! here because the harness crate has no dependency on `cli-session` —
//! the two domains only share the *shape* of a persona, not code.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::run::PersonaRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSpec {
    pub id: String,
    pub name: String,
    pub voice_id: String,
    #[serde(default)]
    pub personality: String,
}

/// `mode=selected,id=X` with X present returns X; X absent or unknown
/// falls back to the first persona. `mode=random` returns one persona
/// uniformly. Errors on an empty list.
pub fn select<'a>(personas: &'a [PersonaSpec], mode: &str, persona_id: Option<&str>) -> anyhow::Result<&'a PersonaSpec> {
    if personas.is_empty() {
        anyhow::bail!("no personas configured");
    }
    if mode == "random" {
        return personas.choose(&mut rand::rng()).ok_or_else(|| anyhow::anyhow!("no personas configured"));
    }
    if let Some(id) = persona_id {
        if let Some(p) = personas.iter().find(|p| p.id == id) {
            return Ok(p);
        }
    }
    Ok(&personas[0])
}

pub fn to_ref(spec: &PersonaSpec) -> PersonaRef {
    PersonaRef { id: spec.id.clone(), name: spec.name.clone(), voice_id: spec.voice_id.clone() }
}

#[cfg(test)]
#[path = "persona_tests.rs"]
mod tests;
