// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persona roster, loaded once at service start (§3.3). A
//! `personas.json` file under `<data_dir>` overrides the built-in
//! defaults when present; otherwise the defaults below are used.

use std::path::Path;

use dashboard_cli_session::Persona;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonaSeed {
    id: String,
    name: String,
    voice_id: String,
    #[serde(default)]
    personality: String,
}

fn default_seeds() -> Vec<PersonaSeed> {
    vec![
        PersonaSeed {
            id: "aria".into(),
            name: "Aria".into(),
            voice_id: "aria".into(),
            personality: "Calm, precise, and encouraging; favors short declarative sentences.".into(),
        },
        PersonaSeed {
            id: "rex".into(),
            name: "Rex".into(),
            voice_id: "rex".into(),
            personality: "Blunt and fast-talking; cuts straight to the actionable steps.".into(),
        },
        PersonaSeed {
            id: "noor".into(),
            name: "Noor".into(),
            voice_id: "noor".into(),
            personality: "Warm and reflective; explains reasoning before conclusions.".into(),
        },
    ]
}

/// Load the persona roster: `<data_dir>/personas.json` if present and
/// parseable, else the built-in defaults.
pub fn load(data_dir: &Path) -> Vec<PersonaSeed> {
    let path = data_dir.join("personas.json");
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<Vec<PersonaSeed>>(&contents) {
            Ok(seeds) if !seeds.is_empty() => seeds,
            Ok(_) => {
                warn!(path = %path.display(), "personas.json is empty, using defaults");
                default_seeds()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse personas.json, using defaults");
                default_seeds()
            }
        },
        Err(_) => default_seeds(),
    }
}

pub fn to_cli_session(seeds: &[PersonaSeed]) -> Vec<Persona> {
    seeds
        .iter()
        .map(|s| Persona {
            id: s.id.clone(),
            name: s.name.clone(),
            voice_id: s.voice_id.clone(),
            personality: s.personality.clone(),
        })
        .collect()
}

pub fn to_harness_spec(seeds: &[PersonaSeed]) -> Vec<dashboard_harness::persona::PersonaSpec> {
    seeds
        .iter()
        .map(|s| dashboard_harness::persona::PersonaSpec {
            id: s.id.clone(),
            name: s.name.clone(),
            voice_id: s.voice_id.clone(),
            personality: s.personality.clone(),
        })
        .collect()
}
