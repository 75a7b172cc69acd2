// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "aria".into(),
            name: "Aria".into(),
            voice_id: "voice-aria".into(),
            personality: "Calm and precise.".into(),
        },
        Persona {
            id: "rex".into(),
            name: "Rex".into(),
            voice_id: "voice-rex".into(),
            personality: String::new(),
        },
    ]
}

#[test]
fn selected_with_known_id_returns_that_persona() {
    let personas = sample_personas();
    let picked = select(&personas, PersonaMode::Selected, Some("rex")).expect("ok");
    assert_eq!(picked.id, "rex");
}

#[test]
fn selected_with_unknown_id_falls_back_to_first() {
    let personas = sample_personas();
    let picked = select(&personas, PersonaMode::Selected, Some("nobody")).expect("ok");
    assert_eq!(picked.id, "aria");
}

#[test]
fn selected_with_no_id_falls_back_to_first() {
    let personas = sample_personas();
    let picked = select(&personas, PersonaMode::Selected, None).expect("ok");
    assert_eq!(picked.id, "aria");
}

#[test]
fn random_picks_from_the_list() {
    let personas = sample_personas();
    for _ in 0..20 {
        let picked = select(&personas, PersonaMode::Random, None).expect("ok");
        assert!(personas.iter().any(|p| p.id == picked.id));
    }
}

#[test]
fn empty_persona_list_is_an_error() {
    assert!(select(&[], PersonaMode::Selected, None).is_err());
}

#[test]
fn prompt_omits_empty_personality() {
    let personas = sample_personas();
    let rex = &personas[1];
    let prompt = build_prompt(rex, "codex", "hello there");
    assert!(!prompt.contains("Persona profile:"));
    assert!(prompt.contains("hello there"));
}

#[test]
fn prompt_includes_personality_when_present() {
    let personas = sample_personas();
    let aria = &personas[0];
    let prompt = build_prompt(aria, "codex", "hi");
    assert!(prompt.contains("Persona profile: Calm and precise."));
    assert!(prompt.contains("Dashboard persona mode (Aria) for codex"));
}
