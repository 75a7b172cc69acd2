// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-interactive "exec" invocations of the three provider CLIs used by
//! harness stages (§4.10 `parent_plan`, `subtask_fanout`,
//! `parent_integrate`, `self_review`, and repair passes). Each provider's
//! one-shot exec mode bypasses its interactive sandbox confirmation, the
//! same way the CLI session service's providers are named in §4.5, but
//! this crate keeps its own tiny binary-name table rather than depending
//! on `dashboard-cli-session`.

/// One of the three fixed provider binaries (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBinary {
    Codex,
    Claude,
    Gemini,
}

impl ProviderBinary {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }
}

/// Build argv for a single one-shot prompt execution: binary, sandbox
/// bypass flags, then the prompt text as the final argument.
pub fn exec_argv(provider: ProviderBinary, prompt: &str) -> Vec<String> {
    let mut argv = vec![provider.binary().to_owned()];
    match provider {
        ProviderBinary::Codex => {
            argv.push("exec".to_owned());
            argv.push("--dangerously-bypass-approvals-and-sandbox".to_owned());
        }
        ProviderBinary::Claude => {
            argv.push("-p".to_owned());
            argv.push("--dangerously-skip-permissions".to_owned());
        }
        ProviderBinary::Gemini => {
            argv.push("--yolo".to_owned());
        }
    }
    argv.push(prompt.to_owned());
    argv
}

#[cfg(test)]
#[path = "cli_argv_tests.rs"]
mod tests;
