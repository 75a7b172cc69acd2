// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! URL / device-code extraction from `auth` subchannel output (§4.6).

use regex::Regex;

/// An extracted auth hint: a login URL and/or a device code found in a
/// chunk of auth-channel output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHint {
    pub url: Option<String>,
    pub code: Option<String>,
}

/// Scan `chunk` (ANSI-stripped or raw; the regexes only care about ASCII
/// structure) for the first URL and first device code. Returns `None` if
/// neither is found.
pub fn extract(chunk: &str) -> Option<AuthHint> {
    #[allow(clippy::expect_used)]
    let url_re = Regex::new(r#"https?://[^\s<>"']+"#).expect("static pattern is valid");
    #[allow(clippy::expect_used)]
    let device_code_re =
        Regex::new(r"\b[A-Z0-9]{4}(-[A-Z0-9]{4}){1,4}\b").expect("static pattern is valid");

    let url = url_re.find(chunk).map(|m| m.as_str().to_owned());
    let code = device_code_re.find(chunk).map(|m| m.as_str().to_owned());
    if url.is_none() && code.is_none() {
        return None;
    }
    Some(AuthHint { url, code })
}

/// Truncate `text` to at most 500 characters for the `auth_hint` payload.
pub fn preview(text: &str) -> String {
    truncate_chars(text, 500)
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
#[path = "hints_tests.rs"]
mod tests;
