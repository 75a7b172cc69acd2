// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error taxonomy shared by the CLI session service and the harness.
///
/// Internal errors otherwise flow as `anyhow::Error` with added context;
/// this enum exists only for the cases an HTTP handler needs to classify
/// and map to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    UnavailableDependency,
    UnknownTarget,
    InvalidInput,
    SessionNotRunning,
    SpawnFailed,
    CommandExit,
    PathEscape,
    Cancelled,
    DirtyRepo,
    NoComposerInteraction,
    NoCapturedOutput,
    UnsupportedAuthMode,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnavailableDependency => 503,
            Self::UnknownTarget => 404,
            Self::InvalidInput => 400,
            Self::SessionNotRunning => 409,
            Self::SpawnFailed => 500,
            Self::CommandExit => 500,
            Self::PathEscape => 400,
            Self::Cancelled => 409,
            Self::DirtyRepo => 422,
            Self::NoComposerInteraction => 400,
            Self::NoCapturedOutput => 400,
            Self::UnsupportedAuthMode => 400,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnavailableDependency => "UNAVAILABLE_DEPENDENCY",
            Self::UnknownTarget => "UNKNOWN_TARGET",
            Self::InvalidInput => "INVALID_INPUT",
            Self::SessionNotRunning => "SESSION_NOT_RUNNING",
            Self::SpawnFailed => "SPAWN_FAILED",
            Self::CommandExit => "COMMAND_EXIT",
            Self::PathEscape => "PATH_ESCAPE",
            Self::Cancelled => "CANCELLED",
            Self::DirtyRepo => "DIRTY_REPO",
            Self::NoComposerInteraction => "NO_COMPOSER_INTERACTION",
            Self::NoCapturedOutput => "NO_CAPTURED_OUTPUT",
            Self::UnsupportedAuthMode => "UNSUPPORTED_AUTH_MODE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf error carrying a classified [`ErrorCode`] plus a human detail
/// string, wrapped in `anyhow::Error` so call sites keep using `?` and
/// `.context(...)`; handlers recover the code via `downcast_ref`.
#[derive(Debug, Clone)]
pub struct ServiceError(pub ErrorCode, pub String);

impl ServiceError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self(code, detail.into())
    }

    pub fn code(&self) -> ErrorCode {
        self.0
    }

    pub fn detail(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.1)
    }
}

impl std::error::Error for ServiceError {}

/// Classify an `anyhow::Error` chain into an `(ErrorCode, detail)` pair,
/// falling back to `Internal` when no [`ServiceError`] is found anywhere
/// in the chain.
pub fn classify(err: &anyhow::Error) -> (ErrorCode, String) {
    for cause in err.chain() {
        if let Some(svc) = cause.downcast_ref::<ServiceError>() {
            return (svc.code(), svc.detail().to_owned());
        }
    }
    (ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
