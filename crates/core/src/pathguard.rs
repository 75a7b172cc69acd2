// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical path containment: any path handed to us by a client must
//! resolve inside an allowlisted root, or the request is rejected with
//! [`ErrorCode::PathEscape`].

use std::path::{Path, PathBuf};

use crate::error::{ErrorCode, ServiceError};

/// Canonicalize `candidate` and require it to equal `root`, or have
/// `root` as a path-component prefix (never a bare string prefix: `/a/bc`
/// must not pass a root of `/a/b`).
pub fn contain(root: &Path, candidate: &Path) -> anyhow::Result<PathBuf> {
    let canon_root =
        root.canonicalize().map_err(|e| anyhow::anyhow!("canonicalize root: {e}"))?;
    let canon_candidate = candidate
        .canonicalize()
        .map_err(|e| ServiceError::new(ErrorCode::PathEscape, format!("cannot resolve path: {e}")))?;

    if canon_candidate == canon_root || canon_candidate.starts_with(&canon_root) {
        Ok(canon_candidate)
    } else {
        Err(ServiceError::new(
            ErrorCode::PathEscape,
            format!("{} escapes root {}", canon_candidate.display(), canon_root.display()),
        )
        .into())
    }
}

/// Same check, but against a root that may not exist on disk yet (used
/// for artifact roots that are created lazily); the root is not
/// canonicalized through the filesystem, only lexically normalized.
pub fn contain_lexical(root: &Path, candidate: &Path) -> anyhow::Result<PathBuf> {
    let joined = if candidate.is_absolute() { candidate.to_path_buf() } else { root.join(candidate) };
    let normalized = normalize_lexically(&joined);
    let normalized_root = normalize_lexically(root);

    if normalized == normalized_root || normalized.starts_with(&normalized_root) {
        Ok(normalized)
    } else {
        Err(ServiceError::new(
            ErrorCode::PathEscape,
            format!("{} escapes root {}", normalized.display(), normalized_root.display()),
        )
        .into())
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "pathguard_tests.rs"]
mod tests;
