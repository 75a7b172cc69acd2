// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value configuration store backed by an env-like file on disk
//! (`KEY=VALUE`, `KEY='VALUE'`, `KEY="VALUE"`, optional leading `export`).
//! Writes are a full rewrite via write-tmp-rename, mode 0600.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use regex::Regex;

const KEY_PATTERN: &str = r"^[A-Z_][A-Z0-9_]*$";

/// Parse the env-file grammar into a key → value map. Malformed lines and
/// comments (lines starting with `#`, after trimming) are skipped.
pub fn parse(contents: &str) -> BTreeMap<String, String> {
    #[allow(clippy::expect_used)]
    let key_re = Regex::new(KEY_PATTERN).expect("static pattern is valid");
    let mut out = BTreeMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, raw_value)) = line.split_once('=') else { continue };
        let key = key.trim();
        if !key_re.is_match(key) {
            continue;
        }
        let value = decode_value(raw_value.trim());
        out.insert(key.to_owned(), value);
    }
    out
}

fn decode_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        decode_double_quoted(&raw[1..raw.len() - 1])
    } else if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        raw[1..raw.len() - 1].to_owned()
    } else {
        strip_inline_comment(raw).trim().to_owned()
    }
}

fn decode_double_quoted(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn strip_inline_comment(raw: &str) -> &str {
    match raw.find('#') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

/// Render a key → value map back into the env-file format: keys sorted,
/// each value single-quoted with the `'\''` escape for embedded quotes.
pub fn render(values: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str("# Generated by dashboard-api. Contains secrets. Do not commit.\n");
    for (key, value) in values {
        out.push_str(key);
        out.push('=');
        out.push('\'');
        out.push_str(&value.replace('\'', "'\\''"));
        out.push_str("'\n");
    }
    out
}

/// Load the store from disk, treating a missing file as empty.
pub fn load(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write the full store atomically (write-tmp, chmod 0600, rename).
pub fn save(path: &Path, values: &BTreeMap<String, String>) -> anyhow::Result<()> {
    let rendered = render(values);
    let tmp_path = tmp_path_for(path);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(rendered.as_bytes())?;
        file.sync_all()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "envstore_tests.rs"]
mod tests;
