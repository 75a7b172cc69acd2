// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The 11-stage harness pipeline (§4.9, §4.10): one `tokio::spawn`ed task
//! per run, driving `init` through `finalize_commit_push` in fixed order,
//! persisting the run snapshot after every stage transition, and checking
//! for a requested cancellation at each stage boundary and at the finer
//! checkpoints named in §4.9 (before each subtask kick-off, before each
//! verification command, before each browser scenario).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashboard_core::pty::supervisor::{Channel, Transcript};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::browser::{self, BrowserDriver};
use crate::cli_argv::{self, ProviderBinary};
use crate::git;
use crate::persona;
use crate::prompts;
use crate::registry::HarnessRegistry;
use crate::run::{
    subtask_channel_name, BrowserRunResult, HarnessRun, PushResult, RunState, StageName, SubtaskResult, WorktreeLayout,
    WorktreeRef, PARENT_CHANNEL,
};
use crate::runner;
use crate::summary;

/// Ring buffer capacity for every harness channel, matching the CLI
/// session service's main channel (`MAIN_RING_CAP` in `dashboard-cli-session`).
const RING_CAP: usize = 220_000;

enum StageOutcome {
    Completed(Option<String>),
    Skipped(String),
    Failed(String),
    Cancelled,
}

/// Run a harness run's pipeline to completion. Never panics: every
/// fallible step is converted into a `Failed`/`Cancelled` stage outcome,
/// and persistence failures are logged and swallowed (§7).
pub async fn run_pipeline(run: Arc<HarnessRun>, registry: Arc<HarnessRegistry>) {
    run.mark_running().await;
    registry.persist(&run).await;

    let orchestrator = channel(&run, &registry, "orchestrator").await;
    orchestrator.push_sys("run started").await;

    for stage in StageName::ALL {
        if run.is_cancel_requested() {
            orchestrator.push_sys("cancellation requested, stopping before next stage").await;
            run.mark_cancelled().await;
            registry.persist(&run).await;
            cleanup(&run).await;
            return;
        }

        run.begin_stage(stage).await;
        orchestrator.push_sys(&format!("stage {} started", stage.as_str())).await;
        registry.persist(&run).await;

        let outcome = dispatch(stage, &run, &registry).await;

        match outcome {
            StageOutcome::Completed(detail) => {
                orchestrator.push_sys(&format!("stage {} completed", stage.as_str())).await;
                run.complete_stage(stage, detail).await;
            }
            StageOutcome::Skipped(reason) => {
                orchestrator.push_sys(&format!("stage {} skipped: {reason}", stage.as_str())).await;
                run.skip_stage(stage, reason).await;
            }
            StageOutcome::Failed(detail) => {
                orchestrator.push_sys(&format!("stage {} failed: {detail}", stage.as_str())).await;
                run.fail_stage(stage, detail).await;
                registry.persist(&run).await;
                finalize(&run, &registry).await;
                registry.persist(&run).await;
                cleanup(&run).await;
                return;
            }
            StageOutcome::Cancelled => {
                orchestrator.push_sys(&format!("stage {} cancelled", stage.as_str())).await;
                run.mark_cancelled().await;
                registry.persist(&run).await;
                cleanup(&run).await;
                return;
            }
        }

        registry.persist(&run).await;
    }

    run.mark_completed().await;
    orchestrator.push_sys("run completed").await;
    finalize(&run, &registry).await;
    registry.persist(&run).await;
    cleanup(&run).await;
}

async fn cleanup(run: &HarnessRun) {
    run.active_jobs.lock().await.clear();
}

async fn finalize(run: &HarnessRun, registry: &HarnessRegistry) {
    let id = run.id.clone();
    let store = ArtifactStore::new(registry.config.artifact_root(&id));
    summary::finalize_summary(run, registry, &store).await;
}

async fn dispatch(stage: StageName, run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    match stage {
        StageName::Init => stage_init(run, registry).await,
        StageName::WorktreePrepare => stage_worktree_prepare(run, registry).await,
        StageName::ArtifactScaffold => stage_artifact_scaffold(run, registry).await,
        StageName::ParentPlan => stage_parent_plan(run, registry).await,
        StageName::SubtaskFanout => stage_subtask_fanout(run, registry).await,
        StageName::SubtaskCollect => stage_subtask_collect(run, registry).await,
        StageName::ParentIntegrate => stage_parent_integrate(run, registry).await,
        StageName::TestVerify => stage_test_verify(run, registry).await,
        StageName::SelfReview => stage_self_review(run, registry).await,
        StageName::BrowserValidation => stage_browser_validation(run, registry).await,
        StageName::FinalizeCommitPush => stage_finalize_commit_push(run, registry).await,
    }
}

async fn channel(run: &Arc<HarnessRun>, registry: &HarnessRegistry, name: &str) -> Arc<Channel> {
    let transcript = Transcript::new(registry.config.transcripts_root.clone(), run.id.clone(), name.to_owned());
    run.ensure_channel(name, RING_CAP, transcript).await
}

fn spawn_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Attach a run-scoped cancellation token to `run.active_jobs`, bound to
/// the run's own token so a cancel request or run teardown stops the
/// command even if nothing else observes it (§4.9, §4.11).
fn job_token(run: &HarnessRun) -> CancellationToken {
    run.cancel.child_token()
}

async fn track(run: &HarnessRun, job_id: &str, token: CancellationToken) {
    run.active_jobs.lock().await.insert(job_id.to_owned(), token);
}

async fn untrack(run: &HarnessRun, job_id: &str) {
    run.active_jobs.lock().await.remove(job_id);
}

// ---------------------------------------------------------------- init

async fn stage_init(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;

    let spec = match persona::select(&registry.personas, &state.task.persona_mode, state.task.persona_id.as_deref()) {
        Ok(p) => p,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };
    run.set_persona(persona::to_ref(spec)).await;

    let repo_root = match git::resolve_contained_repo(&registry.config.shared_repos_root, &state.task.repo_path).await {
        Ok(p) => p,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };

    let base_branch = if state.task.base_branch.trim().is_empty() {
        match git::current_branch(&repo_root).await {
            Ok(b) => b,
            Err(e) => return StageOutcome::Failed(e.to_string()),
        }
    } else {
        state.task.base_branch.clone()
    };

    run.set_repo(repo_root.to_string_lossy().into_owned(), base_branch).await;

    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
    let config_json = serde_json::json!({
        "runId": run.id,
        "title": state.task.title,
        "repoRoot": repo_root.to_string_lossy(),
        "subtaskCount": state.task.subtask_count,
    });
    if let Ok(size) = store.write_json("run-config.json", &config_json).await {
        run.register_artifact("Run configuration", "run-config.json", ArtifactKind::Json, "application/json", Some(size), None).await;
    }

    StageOutcome::Completed(None)
}

// --------------------------------------------------------- worktree_prepare

async fn stage_worktree_prepare(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let Some(repo_root) = state.repo_root.clone() else {
        return StageOutcome::Failed("repo root not resolved".to_owned());
    };
    let repo_root = PathBuf::from(repo_root);
    let base_branch = state.base_branch.clone().unwrap_or_else(|| "main".to_owned());

    let dirty = match git::status_porcelain(&repo_root).await {
        Ok(d) => d,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };
    if !dirty.is_empty() {
        return StageOutcome::Failed(format!("{} uncommitted change(s) in {}", dirty.len(), repo_root.display()));
    }

    let today = chrono_today();
    let final_branch = git::final_branch_name(&state.task.title, &run.id, &today);

    let worktrees_root = registry.config.worktrees_dir(&run.id);
    let parent_path = worktrees_root.join("parent");
    if let Err(e) = git::worktree_add(&repo_root, &parent_path, &final_branch, &base_branch).await {
        return StageOutcome::Failed(e.to_string());
    }
    let parent = WorktreeRef { name: "parent".to_owned(), path: parent_path.to_string_lossy().into_owned(), branch: final_branch.clone() };

    let mut subtasks = Vec::new();
    for i in 1..=state.task.subtask_count {
        let branch = git::subtask_branch_name(&final_branch, i);
        let path = worktrees_root.join(format!("subtask-{i}"));
        if let Err(e) = git::worktree_add(&repo_root, &path, &branch, &base_branch).await {
            return StageOutcome::Failed(e.to_string());
        }
        subtasks.push(WorktreeRef { name: format!("subtask-{i}"), path: path.to_string_lossy().into_owned(), branch });
    }

    run.set_worktrees(WorktreeLayout { base_root: worktrees_root.to_string_lossy().into_owned(), parent, subtasks }).await;

    StageOutcome::Completed(Some(format!("branch {final_branch}")))
}

fn chrono_today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

// ------------------------------------------------------- artifact_scaffold

async fn stage_artifact_scaffold(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let parent_path = PathBuf::from(&worktrees.parent.path);
    let persona_spec = registry.personas.iter().find(|p| Some(&p.id) == state.persona.as_ref().map(|p| &p.id));

    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));

    let docs = [
        ("docs/harness/task-spec.md", prompts::task_spec_md(&state, persona_spec)),
        ("docs/harness/AGENTS.md", prompts::agents_md(&state)),
        ("docs/harness/run-journal.md", prompts::run_journal_seed(&state)),
        ("docs/harness/review-checklist.md", prompts::review_checklist_md().to_owned()),
        ("docs/harness/verification-plan.md", prompts::verification_plan_md(&state)),
    ];

    for (rel, contents) in &docs {
        if let Err(e) = write_into_worktree(&parent_path, rel, contents).await {
            return StageOutcome::Failed(e.to_string());
        }
        match store.write_text(rel, contents).await {
            Ok(size) => {
                run.register_artifact(rel.rsplit('/').next().unwrap_or(rel), *rel, ArtifactKind::Text, "text/markdown", Some(size), None).await;
            }
            Err(e) => return StageOutcome::Failed(e.to_string()),
        }
    }

    for i in 1..=state.task.subtask_count {
        let prompt = prompts::subtask_prompt(&state.task, i);
        let rel = format!("docs/harness/subtasks/subtask-{i}.md");
        let contents = prompts::subtask_md(&state, i, &prompt);
        if let Err(e) = write_into_worktree(&parent_path, &rel, &contents).await {
            return StageOutcome::Failed(e.to_string());
        }
        match store.write_text(&rel, &contents).await {
            Ok(size) => {
                run.register_artifact(format!("Subtask {i} brief"), rel, ArtifactKind::Text, "text/markdown", Some(size), None).await;
            }
            Err(e) => return StageOutcome::Failed(e.to_string()),
        }
    }

    StageOutcome::Completed(None)
}

async fn write_into_worktree(worktree: &Path, rel: &str, contents: &str) -> anyhow::Result<()> {
    let path = worktree.join(rel);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, contents.as_bytes()).await?;
    Ok(())
}

// -------------------------------------------------------------- parent_plan

async fn stage_parent_plan(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let parent_path = PathBuf::from(&worktrees.parent.path);
    let channel = channel(run, registry, PARENT_CHANNEL).await;

    let prompt = prompts::parent_plan_prompt(&state.task);
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &prompt);

    match run_tracked_exec(run, &channel, "parent-plan", &argv, &parent_path).await {
        Ok(outcome) => {
            persist_command_output(run, registry, "parent/plan-output.txt", "Parent plan output", &outcome.plain).await;
            StageOutcome::Completed(None)
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    }
}

async fn run_tracked_exec(
    run: &Arc<HarnessRun>,
    channel: &Arc<Channel>,
    job_id: &str,
    argv: &[String],
    cwd: &Path,
) -> anyhow::Result<runner::CommandOutcome> {
    let token = job_token(run);
    track(run, job_id, token.clone()).await;
    let result = runner::run_cli_exec(channel, &token, argv, cwd, &spawn_env()).await;
    untrack(run, job_id).await;
    result
}

async fn run_tracked_shell(
    run: &Arc<HarnessRun>,
    channel: &Arc<Channel>,
    job_id: &str,
    command: &str,
    cwd: &Path,
    allow_non_zero: bool,
) -> anyhow::Result<runner::CommandOutcome> {
    let token = job_token(run);
    track(run, job_id, token.clone()).await;
    let result = runner::run_shell(channel, &token, command, cwd, &spawn_env(), allow_non_zero).await;
    untrack(run, job_id).await;
    result
}

async fn persist_command_output(run: &HarnessRun, registry: &HarnessRegistry, rel: &str, name: &str, plain: &str) {
    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
    if let Ok(size) = store.write_text(rel, plain).await {
        run.register_artifact(name, rel, ArtifactKind::Text, "text/plain", Some(size), None).await;
    }
}

// ------------------------------------------------------------ subtask_fanout

async fn stage_subtask_fanout(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let count = state.task.subtask_count;
    if count == 0 {
        return StageOutcome::Skipped("subtaskCount is 0".to_owned());
    }
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };

    let mut jobs = Vec::new();
    for i in 1..=count {
        if run.is_cancel_requested() {
            return StageOutcome::Cancelled;
        }
        let Some(wt) = worktrees.subtasks.get((i - 1) as usize).cloned() else {
            return StageOutcome::Failed(format!("missing worktree for subtask {i}"));
        };
        let run = Arc::clone(run);
        let registry = Arc::clone(registry);
        let task = state.task.clone();
        jobs.push(tokio::spawn(async move { run_one_subtask(run, registry, task, i, wt).await }));
    }

    let joined = join_all(jobs).await;
    let mut any_failed = false;
    for handle in joined {
        let result = match handle {
            Ok(r) => r,
            Err(e) => SubtaskResult { ok: false, channel: String::new(), worktree: String::new(), artifact_id: None, error: Some(format!("subtask task panicked: {e}")) },
        };
        if !result.ok {
            any_failed = true;
        }
        run.push_subtask_result(result).await;
    }

    if any_failed {
        StageOutcome::Failed("one or more subtasks failed".to_owned())
    } else {
        StageOutcome::Completed(None)
    }
}

async fn run_one_subtask(
    run: Arc<HarnessRun>,
    registry: Arc<HarnessRegistry>,
    task: crate::run::TaskInput,
    index: u8,
    worktree: WorktreeRef,
) -> SubtaskResult {
    let channel_name = subtask_channel_name(index);
    let channel = channel(&run, &registry, &channel_name).await;
    let prompt = prompts::subtask_prompt(&task, index);
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &prompt);
    let cwd = PathBuf::from(&worktree.path);
    let job_id = format!("subtask-{index}");

    match run_tracked_exec(&run, &channel, &job_id, &argv, &cwd).await {
        Ok(outcome) => {
            let rel = format!("subtasks/subtask-{index}-output.txt");
            let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
            let artifact_id = match store.write_text(&rel, &outcome.plain).await {
                Ok(size) => Some(run.register_artifact(format!("Subtask {index} output"), rel, ArtifactKind::Text, "text/plain", Some(size), None).await.id),
                Err(_) => None,
            };
            SubtaskResult { ok: true, channel: channel_name, worktree: worktree.path, artifact_id, error: None }
        }
        Err(e) => SubtaskResult { ok: false, channel: channel_name, worktree: worktree.path, artifact_id: None, error: Some(e.to_string()) },
    }
}

// ----------------------------------------------------------- subtask_collect

async fn stage_subtask_collect(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    if state.task.subtask_count == 0 {
        return StageOutcome::Skipped("subtaskCount is 0".to_owned());
    }
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };

    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
    let mut summary = serde_json::Map::new();
    for wt in &worktrees.subtasks {
        let path = PathBuf::from(&wt.path);
        let status = git::status_porcelain(&path).await.unwrap_or_default();
        let changed = git::diff_name_only(&path).await.unwrap_or_default();
        summary.insert(wt.name.clone(), serde_json::json!({ "status": status, "changedFiles": changed }));
    }
    let rel = "subtasks/collect-status.json";
    if let Ok(size) = store.write_json(rel, &serde_json::Value::Object(summary)).await {
        run.register_artifact("Subtask status collection", rel, ArtifactKind::Json, "application/json", Some(size), None).await;
    }

    StageOutcome::Completed(None)
}

// --------------------------------------------------------- parent_integrate

async fn stage_parent_integrate(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    if state.task.subtask_count == 0 {
        return StageOutcome::Skipped("subtaskCount is 0".to_owned());
    }
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let parent_path = PathBuf::from(&worktrees.parent.path);
    let channel = channel(run, registry, PARENT_CHANNEL).await;

    let subtask_paths: Vec<String> = worktrees.subtasks.iter().map(|w| w.path.clone()).collect();
    let prompt = prompts::integration_prompt(&state.task, &subtask_paths);
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &prompt);

    match run_tracked_exec(run, &channel, "parent-integrate", &argv, &parent_path).await {
        Ok(outcome) => {
            persist_command_output(run, registry, "parent/integrate-output.txt", "Parent integration output", &outcome.plain).await;
            StageOutcome::Completed(None)
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    }
}

// -------------------------------------------------------------- test_verify

#[derive(serde::Serialize)]
struct VerifyCommandResult {
    command: String,
    ok: bool,
    code: Option<i32>,
    signal: Option<i32>,
    output_tail: String,
}

async fn stage_test_verify(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    if state.task.verification_commands.is_empty() {
        return StageOutcome::Skipped("no verification commands".to_owned());
    }
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let parent_path = PathBuf::from(&worktrees.parent.path);
    let channel = channel(run, registry, PARENT_CHANNEL).await;

    let attempt1 = match run_verification_pass(run, &channel, &parent_path, &state.task.verification_commands).await {
        Ok(r) => r,
        Err(_) => return StageOutcome::Cancelled,
    };
    persist_verify_attempt(run, registry, 1, &attempt1).await;

    let failed: Vec<&VerifyCommandResult> = attempt1.iter().filter(|r| !r.ok).collect();
    if failed.is_empty() {
        return StageOutcome::Completed(None);
    }

    let reason = failed.iter().map(|r| format!("`{}`: {}", r.command, tail(&r.output_tail, 500))).collect::<Vec<_>>().join("\n");
    let repair_prompt = prompts::repair_prompt(&reason);
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &repair_prompt);
    if let Err(e) = run_tracked_exec(run, &channel, "test-verify-repair", &argv, &parent_path).await {
        return StageOutcome::Failed(format!("repair pass failed: {e}"));
    }

    let failed_commands: Vec<String> = failed.iter().map(|r| r.command.clone()).collect();
    let attempt2 = match run_verification_pass(run, &channel, &parent_path, &failed_commands).await {
        Ok(r) => r,
        Err(_) => return StageOutcome::Cancelled,
    };
    persist_verify_attempt(run, registry, 2, &attempt2).await;

    let still_failing: Vec<&str> = attempt2.iter().filter(|r| !r.ok).map(|r| r.command.as_str()).collect();
    if still_failing.is_empty() {
        StageOutcome::Completed(Some("passed after repair".to_owned()))
    } else {
        StageOutcome::Failed(format!("verification still failing: {}", still_failing.join(", ")))
    }
}

async fn run_verification_pass(
    run: &Arc<HarnessRun>,
    channel: &Arc<Channel>,
    cwd: &Path,
    commands: &[String],
) -> Result<Vec<VerifyCommandResult>, ()> {
    let mut out = Vec::new();
    for (i, command) in commands.iter().enumerate() {
        if run.is_cancel_requested() {
            return Err(());
        }
        let job_id = format!("verify-{i}");
        match run_tracked_shell(run, channel, &job_id, command, cwd, true).await {
            Ok(outcome) => out.push(VerifyCommandResult {
                command: command.clone(),
                ok: outcome.code == Some(0),
                code: outcome.code,
                signal: outcome.signal,
                output_tail: tail(&outcome.plain, 5000),
            }),
            Err(e) => out.push(VerifyCommandResult { command: command.clone(), ok: false, code: None, signal: None, output_tail: e.to_string() }),
        }
    }
    Ok(out)
}

async fn persist_verify_attempt(run: &HarnessRun, registry: &HarnessRegistry, attempt: u8, results: &[VerifyCommandResult]) {
    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
    let rel = format!("verify/attempt-{attempt}.json");
    if let Ok(value) = serde_json::to_value(results) {
        if let Ok(size) = store.write_json(&rel, &value).await {
            run.register_artifact(format!("Verification attempt {attempt}"), rel, ArtifactKind::Json, "application/json", Some(size), None).await;
        }
    }
}

fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_owned()
    } else {
        text.chars().skip(count - max).collect()
    }
}

// -------------------------------------------------------------- self_review

async fn stage_self_review(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let parent_path = PathBuf::from(&worktrees.parent.path);
    let channel = channel(run, registry, PARENT_CHANNEL).await;

    let prompt = prompts::self_review_prompt(&state.task);
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &prompt);

    match run_tracked_exec(run, &channel, "self-review", &argv, &parent_path).await {
        Ok(outcome) => {
            persist_command_output(run, registry, "parent/self-review-output.txt", "Self review output", &outcome.plain).await;
            StageOutcome::Completed(None)
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    }
}

// ------------------------------------------------------- browser_validation

async fn stage_browser_validation(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    if state.task.browser_scenarios.is_empty() {
        return StageOutcome::Skipped("no browser scenarios".to_owned());
    }
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let Some(executable) = browser::detect_browser_executable() else {
        return StageOutcome::Failed("no browser executable found on this host".to_owned());
    };

    let worker = channel(run, registry, "browser-worker").await;
    worker.push_sys("launching browser").await;

    let driver = match BrowserDriver::launch(&executable).await {
        Ok(d) => d,
        Err(e) => return StageOutcome::Failed(format!("failed to launch browser: {e}")),
    };

    let attempt1 = match run_browser_pass(run, registry, &worker, &driver, &state.task.browser_scenarios, 1).await {
        Ok(r) => r,
        Err(_) => return StageOutcome::Cancelled,
    };

    let failed: Vec<_> = attempt1.iter().filter(|r| !r.ok).cloned().collect();
    if failed.is_empty() {
        run.set_browser_result(BrowserRunResult { scenarios: attempt1 }).await;
        return StageOutcome::Completed(None);
    }

    let parent_path = PathBuf::from(&worktrees.parent.path);
    let channel = channel(run, registry, PARENT_CHANNEL).await;
    let reason = failed.iter().map(|r| format!("{}: {}", r.name, r.error.clone().unwrap_or_default())).collect::<Vec<_>>().join("\n");
    let argv = cli_argv::exec_argv(ProviderBinary::Codex, &prompts::repair_prompt(&reason));
    if let Err(e) = run_tracked_exec(run, &channel, "browser-repair", &argv, &parent_path).await {
        return StageOutcome::Failed(format!("browser repair pass failed: {e}"));
    }

    let retry_scenarios: Vec<_> = state.task.browser_scenarios.iter().filter(|s| failed.iter().any(|f| f.name == s.name)).cloned().collect();
    let attempt2 = match run_browser_pass(run, registry, &worker, &driver, &retry_scenarios, 2).await {
        Ok(r) => r,
        Err(_) => return StageOutcome::Cancelled,
    };

    let mut merged = attempt1;
    for r in attempt2 {
        if let Some(slot) = merged.iter_mut().find(|m| m.name == r.name) {
            *slot = r;
        }
    }
    let still_failing = merged.iter().filter(|r| !r.ok).count();
    run.set_browser_result(BrowserRunResult { scenarios: merged }).await;

    if still_failing == 0 {
        StageOutcome::Completed(Some("passed after repair".to_owned()))
    } else {
        StageOutcome::Failed(format!("{still_failing} browser scenario(s) still failing"))
    }
}

async fn run_browser_pass(
    run: &Arc<HarnessRun>,
    registry: &Arc<HarnessRegistry>,
    worker: &Arc<Channel>,
    driver: &BrowserDriver,
    scenarios: &[crate::run::BrowserScenario],
    attempt: u8,
) -> Result<Vec<crate::run::BrowserScenarioResult>, ()> {
    let store = ArtifactStore::new(registry.config.artifact_root(&run.id));
    let mut out = Vec::new();
    for scenario in scenarios {
        if run.is_cancel_requested() {
            return Err(());
        }
        worker.push_sys(&format!("running scenario {}", scenario.name)).await;
        let tmp_dir = std::env::temp_dir().join(format!("harness-{}-{}-{attempt}.png", run.id, scenario.name));
        let mut result = driver.run_scenario(scenario, &tmp_dir).await;
        if result.ok {
            let rel = format!("browser/{}-attempt{attempt}.png", scenario.name);
            if let Ok(size) = store.copy_from(&rel, &tmp_dir).await {
                let record = run.register_artifact(format!("{} screenshot", scenario.name), rel, ArtifactKind::Image, "image/png", Some(size), None).await;
                result.screenshot_artifact_id = Some(record.id);
            }
        }
        let _ = tokio::fs::remove_file(&tmp_dir).await;
        out.push(result);
    }
    Ok(out)
}

// --------------------------------------------------- finalize_commit_push

async fn stage_finalize_commit_push(run: &Arc<HarnessRun>, registry: &Arc<HarnessRegistry>) -> StageOutcome {
    let state = run.snapshot().await;
    let Some(worktrees) = state.worktrees.clone() else {
        return StageOutcome::Failed("worktrees not prepared".to_owned());
    };
    let final_branch = worktrees.parent.branch.clone();
    let parent_path = PathBuf::from(&worktrees.parent.path);

    if let Err(e) = git::add_all(&parent_path).await {
        return StageOutcome::Failed(e.to_string());
    }
    let dirty = match git::status_porcelain(&parent_path).await {
        Ok(d) => d,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };

    if dirty.is_empty() {
        run.set_push_outcome(
            final_branch,
            None,
            PushResult { ok: true, skipped: true, reason: Some("no changes to push".to_owned()), code: None, branch: None, remote: None, output_tail: None },
        )
        .await;
        return StageOutcome::Completed(Some("no changes".to_owned()));
    }

    let message = commit_message(&state, &final_branch);
    if let Err(e) = git::commit(&parent_path, &message).await {
        return StageOutcome::Failed(e.to_string());
    }

    let final_commit = match git::rev_parse_head(&parent_path).await {
        Ok(c) => c,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };

    let push_outcome = match git::push(&parent_path, &registry.config.remote, &final_branch).await {
        Ok(p) => p,
        Err(e) => return StageOutcome::Failed(e.to_string()),
    };

    let push_result = PushResult {
        ok: push_outcome.ok,
        skipped: false,
        reason: None,
        code: push_outcome.code,
        branch: Some(final_branch.clone()),
        remote: Some(registry.config.remote.clone()),
        output_tail: Some(push_outcome.output_tail),
    };
    let ok = push_result.ok;
    run.set_push_outcome(final_branch, Some(final_commit), push_result).await;

    if ok {
        StageOutcome::Completed(None)
    } else {
        StageOutcome::Failed("git push failed".to_owned())
    }
}

fn commit_message(state: &RunState, branch: &str) -> String {
    let subject = {
        let s = format!("Harness: {}", state.task.title);
        if s.chars().count() > 72 {
            s.chars().take(72).collect()
        } else {
            s
        }
    };
    format!(
        "{subject}\n\nRun id: {}\nBranch: {branch}\nObjective: {}\n\nSource: harness\n",
        state.id, state.task.objective
    )
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
