// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem roots the harness pipeline is allowed to touch (§5 path
//! containment policy, §6.4 persisted state layout).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Allowlisted root for `TaskInput::repo_path` (§4.10 `init`,
    /// §5: `<home>/shared-repos`).
    pub shared_repos_root: PathBuf,
    /// Root under which per-run worktrees are created:
    /// `<harnessWorkspace>/worktrees/<runId>/{parent,subtask-i}`.
    pub workspace_root: PathBuf,
    /// `<harnessArtifacts>/<runId>/...` (§4.12).
    pub artifacts_root: PathBuf,
    /// `<harnessRuns>/<runId>.json` (§4.12, §4.14).
    pub runs_root: PathBuf,
    /// Transcript directory for this run's channels, mirroring the
    /// `<owner>-<channel>-YYYYMMDD.jsonl` convention the CLI session
    /// service uses under `ai-cli/transcripts/` (§4.3, §6.4).
    pub transcripts_root: PathBuf,
    /// Git remote name used by `finalize_commit_push` (§4.10).
    pub remote: String,
}

impl HarnessConfig {
    pub fn worktrees_dir(&self, run_id: &str) -> PathBuf {
        self.workspace_root.join("worktrees").join(run_id)
    }

    pub fn artifact_root(&self, run_id: &str) -> PathBuf {
        self.artifacts_root.join(run_id)
    }

    pub fn run_snapshot_path(&self, run_id: &str) -> PathBuf {
        self.runs_root.join(format!("{run_id}.json"))
    }
}
