// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run summary finalization (§4.13): a deterministic summary, optionally
//! rewritten by an LLM, written to `summary/final-summary.txt`.

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::registry::HarnessRegistry;
use crate::run::{HarnessRun, RunState, RunStatus, StageStatus};
use tracing::warn;

/// Build the deterministic summary text (§4.13); always succeeds.
pub fn build_summary(state: &RunState) -> String {
    let mut out = format!(
        "Run {} — {}\nStatus: {:?}\n",
        state.id, state.task.title, state.status
    );
    if let Some(root) = &state.repo_root {
        out.push_str(&format!("Repo root: {root}\n"));
    }
    if let Some(branch) = &state.final_branch {
        out.push_str(&format!("Branch: {branch}\n"));
    }
    if let Some(commit) = &state.final_commit {
        out.push_str(&format!("Commit: {commit}\n"));
    }

    let first_failed = state.stages.iter().find(|s| s.status == StageStatus::Failed);
    if let Some(stage) = first_failed {
        out.push_str(&format!("First failed stage: {} ({})\n", stage.name.as_str(), stage.detail.clone().unwrap_or_default()));
    }

    let total = state.stages.len();
    let completed = state.stages.iter().filter(|s| s.status == StageStatus::Completed).count();
    let skipped = state.stages.iter().filter(|s| s.status == StageStatus::Skipped).count();
    out.push_str(&format!("Stages: {completed}/{total} completed (skipped {skipped})\n"));

    out.push_str(&format!("Verification commands: {}\n", state.task.verification_commands.len()));

    if !state.task.browser_scenarios.is_empty() {
        let ok = state.browser_result.as_ref().map(|r| r.scenarios.iter().filter(|s| s.ok).count()).unwrap_or(0);
        out.push_str(&format!("Browser scenarios: {}/{} ok\n", ok, state.task.browser_scenarios.len()));
    }

    if let Some(push) = &state.push_result {
        if push.skipped {
            out.push_str("Push: skipped (no changes)\n");
        } else {
            out.push_str(&format!("Push: {}\n", if push.ok { "ok" } else { "failed" }));
        }
    }

    out
}

fn rewrite_prompt(deterministic: &str) -> String {
    format!(
        "Rewrite the following automated run summary in at most 180 words. Keep it\n\
         factual; do not invent details not present in the source text.\n\n{deterministic}"
    )
}

/// Finalize the run's summary (success or failure path). Errors writing
/// the artifact are swallowed per §7: the run's terminal status is
/// recorded either way.
pub async fn finalize_summary(run: &HarnessRun, registry: &HarnessRegistry, artifact_store: &ArtifactStore) {
    let state = run.snapshot().await;
    let deterministic = build_summary(&state);

    let mut final_text = deterministic.clone();
    if state.status != RunStatus::Cancelled {
        if let Some(llm) = &registry.llm {
            match llm.complete(&rewrite_prompt(&deterministic)).await {
                Ok(text) if !text.trim().is_empty() => final_text = text.trim().to_owned(),
                Ok(_) => {}
                Err(e) => warn!(run_id = %state.id, error = %e, "llm summary rewrite failed, using deterministic summary"),
            }
        }
    }

    run.set_summary(final_text.clone()).await;

    match artifact_store.write_text("summary/final-summary.txt", &final_text).await {
        Ok(size) => {
            run.register_artifact(
                "Final summary",
                "summary/final-summary.txt",
                ArtifactKind::Text,
                "text/plain",
                Some(size),
                None,
            )
            .await;
        }
        Err(e) => warn!(run_id = %state.id, error = %e, "failed to write final summary artifact"),
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
