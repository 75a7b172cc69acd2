// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::persona::Persona;

fn personas() -> Vec<Persona> {
    vec![
        Persona { id: "aria".into(), name: "Aria".into(), voice_id: "v1".into(), personality: String::new() },
        Persona { id: "rex".into(), name: "Rex".into(), voice_id: "v2".into(), personality: String::new() },
    ]
}

#[test]
fn normalize_extract_joins_and_trims() {
    let raw = vec![(1u64, 0i64, "hello\r\n".to_owned()), (2u64, 0i64, "\n\n\nworld\n".to_owned())];
    let text = normalize_extract(&raw).expect("ok");
    assert!(text.starts_with("hello"));
    assert!(text.ends_with("world"));
    // CR was normalized, and the 3+ newline run was collapsed to 2.
    assert!(!text.contains('\r'));
    assert!(!text.contains("\n\n\n"));
}

#[test]
fn normalize_extract_fails_on_empty_segments() {
    assert!(normalize_extract(&[]).is_err());
}

#[test]
fn normalize_extract_fails_when_only_whitespace() {
    let raw = vec![(1u64, 0i64, "   \n\t  ".to_owned())];
    assert!(normalize_extract(&raw).is_err());
}

#[test]
fn normalize_extract_keeps_only_the_last_14000_chars() {
    let raw = vec![(1u64, 0i64, "a".repeat(20_000))];
    let text = normalize_extract(&raw).expect("ok");
    assert_eq!(text.chars().count(), MAX_EXTRACT_CHARS);
}

#[test]
fn deterministic_summary_keeps_substantive_lines() {
    let source = "real output line one\n$ \n# decoration\nreal output line two\nx\n";
    let summary = deterministic_summary(source);
    assert!(summary.contains("- real output line one"));
    assert!(summary.contains("- real output line two"));
    assert!(!summary.contains("$"));
}

#[test]
fn deterministic_summary_caps_at_eight_bullets() {
    let source = (0..20).map(|i| format!("line number {i}")).collect::<Vec<_>>().join("\n");
    let summary = deterministic_summary(&source);
    assert_eq!(summary.lines().count(), 8);
}

#[test]
fn deterministic_summary_falls_back_to_single_bullet() {
    let source = "$\n>\n#\n";
    let summary = deterministic_summary(source);
    assert_eq!(summary.lines().count(), 1);
    assert!(summary.starts_with("- "));
}

#[test]
fn resolve_persona_prefers_explicit_override() {
    let ps = personas();
    let picked = resolve_persona(&ps, Some("rex"), Some("aria")).expect("found");
    assert_eq!(picked.id, "rex");
}

#[test]
fn resolve_persona_falls_back_to_marker_then_default() {
    let ps = personas();
    assert_eq!(resolve_persona(&ps, None, Some("rex")).unwrap().id, "rex");
    assert_eq!(resolve_persona(&ps, None, None).unwrap().id, "aria");
    assert_eq!(resolve_persona(&ps, Some("nope"), Some("rex")).unwrap().id, "rex");
}
