// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The interactive CLI session service: a fixed registry of three
//! provider-backed PTY sessions (`codex`, `claude`, `gemini`), each with a
//! `main` channel (the interactive REPL) and an `auth` channel (a
//! short-lived login subprocess), plus the persona composer and narrator
//! that sit on top of them.

pub mod auth;
pub mod hints;
pub mod narrator;
pub mod persona;
pub mod provider;

pub use persona::Persona;
pub use provider::{AuthStatus, LastComposerInteraction, PersonaPreference, Provider, ProviderId, ProviderRegistry};
