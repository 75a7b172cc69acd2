// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The harness run registry (§4.14): owns in-memory runs, starts each
//! run's pipeline task, persists run snapshots, and recovers runs that
//! have no in-memory presence from their last snapshot on disk.

use std::collections::HashMap;
use std::sync::Arc;

use dashboard_core::error::{ErrorCode, ServiceError};
use dashboard_core::llm::LlmClient;
use dashboard_core::tts::TtsClient;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::persona::PersonaSpec;
use crate::run::{HarnessRun, RunState, TaskInput};

/// Cap on the merged run listing (§4.14).
const LIST_RUNS_CAP: usize = 100;

pub struct HarnessRegistry {
    pub config: HarnessConfig,
    pub personas: Vec<PersonaSpec>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub tts: Option<Arc<dyn TtsClient>>,
    runs: RwLock<HashMap<String, Arc<HarnessRun>>>,
}

impl HarnessRegistry {
    pub fn new(
        config: HarnessConfig,
        personas: Vec<PersonaSpec>,
        llm: Option<Arc<dyn LlmClient>>,
        tts: Option<Arc<dyn TtsClient>>,
    ) -> Arc<Self> {
        Arc::new(Self { config, personas, llm, tts, runs: RwLock::new(HashMap::new()) })
    }

    /// Create a run, register it in memory, and spawn its pipeline task
    /// (§4.9). Returns immediately with the `created` run; the pipeline
    /// runs in the background.
    pub async fn create_run(self: &Arc<Self>, task: TaskInput) -> Arc<HarnessRun> {
        let id = format!("run-{}", Uuid::new_v4());
        let run = HarnessRun::new(id.clone(), task);
        self.runs.write().await.insert(id, Arc::clone(&run));

        let registry = Arc::clone(self);
        let pipeline_run = Arc::clone(&run);
        tokio::spawn(async move {
            crate::pipeline::run_pipeline(pipeline_run, registry).await;
        });

        run
    }

    /// In-memory lookup, falling back to the on-disk snapshot (§4.14
    /// `get_run`). A run recovered this way has no live channels or
    /// active-job table; it is read-only.
    pub async fn get(&self, id: &str) -> anyhow::Result<Arc<HarnessRun>> {
        if let Some(run) = self.runs.read().await.get(id).cloned() {
            return Ok(run);
        }
        let path = self.config.run_snapshot_path(id);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ServiceError::new(ErrorCode::UnknownTarget, format!("unknown run {id}")))?;
        let state: RunState = serde_json::from_str(&contents)
            .map_err(|e| ServiceError::new(ErrorCode::Internal, format!("corrupt run snapshot: {e}")))?;
        Ok(HarnessRun::from_state(state))
    }

    pub async fn request_cancel(&self, id: &str) -> anyhow::Result<()> {
        let run = self
            .runs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::new(ErrorCode::UnknownTarget, format!("unknown run {id}")))?;
        run.request_cancel();
        Ok(())
    }

    /// Merge in-memory runs with all on-disk snapshots not already held
    /// in memory, sorted by `updatedAt` (falling back to `createdAt`)
    /// descending, capped at [`LIST_RUNS_CAP`] (§4.14).
    pub async fn list_runs(&self) -> Vec<RunState> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for run in self.runs.read().await.values() {
            let state = run.snapshot().await;
            seen.insert(state.id.clone());
            out.push(state);
        }

        if let Ok(mut entries) = tokio::fs::read_dir(&self.config.runs_root).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if seen.contains(stem) {
                    continue;
                }
                if let Ok(contents) = tokio::fs::read_to_string(&path).await {
                    if let Ok(state) = serde_json::from_str::<RunState>(&contents) {
                        seen.insert(state.id.clone());
                        out.push(state);
                    }
                }
            }
        }

        out.sort_by(|a, b| {
            let a_key = a.updated_at;
            let b_key = b.updated_at;
            b_key.cmp(&a_key)
        });
        out.truncate(LIST_RUNS_CAP);
        out
    }

    /// Write `<harnessRuns>/<runId>.json` atomically, mode 0600 (§4.12).
    /// Best-effort: a write failure is logged and swallowed, matching
    /// the "errors in finalizing summary are swallowed" policy (§7) — the
    /// in-memory state remains authoritative either way.
    pub async fn persist(&self, run: &HarnessRun) {
        let state = run.snapshot().await;
        if let Err(e) = self.persist_inner(&state).await {
            warn!(run_id = %state.id, error = %e, "failed to persist run snapshot");
        }
    }

    async fn persist_inner(&self, state: &RunState) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.config.runs_root).await?;
        let path = self.config.run_snapshot_path(&state.id);
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(format!(".tmp-{}", std::process::id()));
        let tmp_path = path.with_file_name(tmp_name);

        let rendered = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&tmp_path, &rendered).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
