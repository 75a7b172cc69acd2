// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness Run data model (§3.5): the immutable task input, the mutable
//! run state machine, and the in-memory handle (channels, active jobs,
//! cancellation) that sits alongside the persisted state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashboard_core::pty::supervisor::Channel;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactKind, ArtifactRecord};

/// Largest `subtaskCount` the API accepts (§3.5).
pub const MAX_SUBTASKS: u8 = 3;

/// Fixed parent channel name; subtask channels are `subtask-<i>`.
pub const PARENT_CHANNEL: &str = "parent";

pub fn subtask_channel_name(i: u8) -> String {
    format!("subtask-{i}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Fixed stage order (§4.9). `ALL` is the declared order used to drive
/// the pipeline and to validate the "stage monotonicity" property (§8.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Init,
    WorktreePrepare,
    ArtifactScaffold,
    ParentPlan,
    SubtaskFanout,
    SubtaskCollect,
    ParentIntegrate,
    TestVerify,
    SelfReview,
    BrowserValidation,
    FinalizeCommitPush,
}

impl StageName {
    pub const ALL: [StageName; 11] = [
        StageName::Init,
        StageName::WorktreePrepare,
        StageName::ArtifactScaffold,
        StageName::ParentPlan,
        StageName::SubtaskFanout,
        StageName::SubtaskCollect,
        StageName::ParentIntegrate,
        StageName::TestVerify,
        StageName::SelfReview,
        StageName::BrowserValidation,
        StageName::FinalizeCommitPush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::WorktreePrepare => "worktree_prepare",
            Self::ArtifactScaffold => "artifact_scaffold",
            Self::ParentPlan => "parent_plan",
            Self::SubtaskFanout => "subtask_fanout",
            Self::SubtaskCollect => "subtask_collect",
            Self::ParentIntegrate => "parent_integrate",
            Self::TestVerify => "test_verify",
            Self::SelfReview => "self_review",
            Self::BrowserValidation => "browser_validation",
            Self::FinalizeCommitPush => "finalize_commit_push",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub name: StageName,
    pub status: StageStatus,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub duration_ms: Option<i64>,
    pub detail: Option<String>,
}

impl StageRecord {
    fn pending(name: StageName) -> Self {
        Self { name, status: StageStatus::Pending, started_at: None, finished_at: None, duration_ms: None, detail: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillStep {
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserScenario {
    pub name: String,
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub wait_selector: Option<String>,
    #[serde(default)]
    pub wait_text: Option<String>,
    #[serde(default)]
    pub fill: Vec<FillStep>,
    #[serde(default)]
    pub click: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    15
}

impl BrowserScenario {
    /// Clamp to `[1, 60]` seconds per §5.
    pub fn clamped_timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(1, 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub repo_path: String,
    pub objective: String,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub base_branch: String,
    #[serde(default)]
    pub subtask_count: u8,
    #[serde(default)]
    pub verification_commands: Vec<String>,
    #[serde(default)]
    pub browser_scenarios: Vec<BrowserScenario>,
    #[serde(default)]
    pub subtask_prompts: Vec<Option<String>>,
    #[serde(default = "default_persona_mode")]
    pub persona_mode: String,
    #[serde(default)]
    pub persona_id: Option<String>,
}

fn default_persona_mode() -> String {
    "selected".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRef {
    pub id: String,
    pub name: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeRef {
    pub name: String,
    pub path: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeLayout {
    pub base_root: String,
    pub parent: WorktreeRef,
    pub subtasks: Vec<WorktreeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskResult {
    pub ok: bool,
    pub channel: String,
    pub worktree: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    pub ok: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserScenarioResult {
    pub name: String,
    pub ok: bool,
    #[serde(default)]
    pub console_errors: Vec<String>,
    #[serde(default)]
    pub page_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_artifact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserRunResult {
    pub scenarios: Vec<BrowserScenarioResult>,
}

/// The mutable, persisted portion of a run: everything written to
/// `<harnessRuns>/<runId>.json` (§4.12). Channels, active-job handles,
/// and the cancellation token live alongside this in [`HarnessRun`]
/// since they are not serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub status: RunStatus,
    pub cancel_requested: bool,
    pub current_stage: Option<StageName>,
    pub error: Option<String>,
    pub task: TaskInput,
    pub persona: Option<PersonaRef>,
    pub repo_root: Option<String>,
    pub base_branch: Option<String>,
    pub worktrees: Option<WorktreeLayout>,
    pub stages: Vec<StageRecord>,
    pub artifacts: Vec<ArtifactRecord>,
    pub artifact_seq: u32,
    pub summary_text: Option<String>,
    pub final_branch: Option<String>,
    pub final_commit: Option<String>,
    pub push_result: Option<PushResult>,
    pub subtask_results: Vec<SubtaskResult>,
    pub browser_result: Option<BrowserRunResult>,
}

impl RunState {
    fn new(id: String, task: TaskInput, now: i64) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            status: RunStatus::Created,
            cancel_requested: false,
            current_stage: None,
            error: None,
            task,
            persona: None,
            repo_root: None,
            base_branch: None,
            worktrees: None,
            stages: StageName::ALL.iter().map(|n| StageRecord::pending(*n)).collect(),
            artifacts: Vec::new(),
            artifact_seq: 0,
            summary_text: None,
            final_branch: None,
            final_commit: None,
            push_result: None,
            subtask_results: Vec::new(),
            browser_result: None,
        }
    }

    #[allow(clippy::expect_used)]
    fn stage_mut(&mut self, name: StageName) -> &mut StageRecord {
        self.stages.iter_mut().find(|s| s.name as u8 == name as u8).expect("every StageName has a record")
    }
}

pub fn now_unix_ms() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// A live run: the persisted [`RunState`] plus the channels, active-job
/// cancellation handles, and the run-level cancellation token that only
/// exist while the run's pipeline task is alive.
pub struct HarnessRun {
    pub id: String,
    pub channels: RwLock<HashMap<String, Arc<Channel>>>,
    pub cancel: CancellationToken,
    pub active_jobs: Mutex<HashMap<String, CancellationToken>>,
    pub state: RwLock<RunState>,
    persisted_recently: AtomicBool,
}

impl HarnessRun {
    pub fn new(id: String, task: TaskInput) -> Arc<Self> {
        let now = now_unix_ms();
        Arc::new(Self {
            id: id.clone(),
            channels: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
            active_jobs: Mutex::new(HashMap::new()),
            state: RwLock::new(RunState::new(id, task, now)),
            persisted_recently: AtomicBool::new(false),
        })
    }

    pub fn from_state(state: RunState) -> Arc<Self> {
        Arc::new(Self {
            id: state.id.clone(),
            channels: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
            active_jobs: Mutex::new(HashMap::new()),
            state: RwLock::new(state),
            persisted_recently: AtomicBool::new(false),
        })
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn snapshot(&self) -> RunState {
        self.state.read().await.clone()
    }

    pub async fn mark_running(&self) {
        let mut state = self.state.write().await;
        state.status = RunStatus::Running;
        state.started_at = Some(now_unix_ms());
        state.updated_at = now_unix_ms();
    }

    pub async fn set_persona(&self, persona: PersonaRef) {
        let mut state = self.state.write().await;
        state.persona = Some(persona);
        state.updated_at = now_unix_ms();
    }

    pub async fn set_repo(&self, repo_root: String, base_branch: String) {
        let mut state = self.state.write().await;
        state.repo_root = Some(repo_root);
        state.base_branch = Some(base_branch);
        state.updated_at = now_unix_ms();
    }

    pub async fn set_worktrees(&self, layout: WorktreeLayout) {
        let mut state = self.state.write().await;
        state.worktrees = Some(layout);
        state.updated_at = now_unix_ms();
    }

    pub async fn push_subtask_result(&self, result: SubtaskResult) {
        let mut state = self.state.write().await;
        state.subtask_results.push(result);
        state.updated_at = now_unix_ms();
    }

    pub async fn set_browser_result(&self, result: BrowserRunResult) {
        let mut state = self.state.write().await;
        state.browser_result = Some(result);
        state.updated_at = now_unix_ms();
    }

    pub async fn set_summary(&self, summary: String) {
        let mut state = self.state.write().await;
        state.summary_text = Some(summary);
        state.updated_at = now_unix_ms();
    }

    pub async fn set_push_outcome(&self, final_branch: String, final_commit: Option<String>, push_result: PushResult) {
        let mut state = self.state.write().await;
        state.final_branch = Some(final_branch);
        state.final_commit = final_commit;
        state.push_result = Some(push_result);
        state.updated_at = now_unix_ms();
    }

    /// Idempotently create and register a named channel for this run
    /// (`orchestrator`, `parent`, `subtask-<i>`, `browser-worker`; §3.5).
    pub async fn ensure_channel(
        &self,
        name: &str,
        ring_cap: usize,
        transcript: dashboard_core::pty::supervisor::Transcript,
    ) -> Arc<Channel> {
        if let Some(existing) = self.channels.read().await.get(name) {
            return Arc::clone(existing);
        }
        let channel = Channel::new(name, ring_cap, transcript, 200, 50);
        self.channels.write().await.insert(name.to_owned(), Arc::clone(&channel));
        channel
    }

    pub async fn get_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(name).cloned()
    }

    pub async fn begin_stage(&self, name: StageName) {
        let mut state = self.state.write().await;
        state.current_stage = Some(name);
        let now = now_unix_ms();
        state.updated_at = now;
        let stage = state.stage_mut(name);
        stage.status = StageStatus::Running;
        stage.started_at = Some(now);
    }

    pub async fn complete_stage(&self, name: StageName, detail: Option<String>) {
        self.finish_stage(name, StageStatus::Completed, detail).await;
    }

    pub async fn skip_stage(&self, name: StageName, detail: impl Into<String>) {
        self.finish_stage(name, StageStatus::Skipped, Some(detail.into())).await;
    }

    pub async fn fail_stage(&self, name: StageName, detail: impl Into<String>) {
        let detail = detail.into();
        self.finish_stage(name, StageStatus::Failed, Some(detail.clone())).await;
        let mut state = self.state.write().await;
        state.status = RunStatus::Failed;
        state.error = Some(detail);
        state.finished_at = Some(now_unix_ms());
    }

    pub async fn mark_cancelled(&self) {
        let mut state = self.state.write().await;
        let now = now_unix_ms();
        state.status = RunStatus::Cancelled;
        state.cancel_requested = true;
        state.finished_at = Some(now);
        state.updated_at = now;
    }

    pub async fn mark_completed(&self) {
        let mut state = self.state.write().await;
        let now = now_unix_ms();
        state.status = RunStatus::Completed;
        state.finished_at = Some(now);
        state.updated_at = now;
    }

    async fn finish_stage(&self, name: StageName, status: StageStatus, detail: Option<String>) {
        let mut state = self.state.write().await;
        let now = now_unix_ms();
        state.updated_at = now;
        let stage = state.stage_mut(name);
        stage.status = status;
        stage.finished_at = Some(now);
        stage.duration_ms = Some(now - stage.started_at.unwrap_or(now));
        stage.detail = detail;
    }

    /// Register a newly written artifact, assigning the next `a<NNNN>`
    /// id from the run's monotonic per-run counter (§4.12).
    pub async fn register_artifact(
        &self,
        name: impl Into<String>,
        rel_path: impl Into<String>,
        kind: ArtifactKind,
        mime: impl Into<String>,
        size: Option<u64>,
        description: Option<String>,
    ) -> ArtifactRecord {
        let mut state = self.state.write().await;
        state.artifact_seq += 1;
        let record = ArtifactRecord {
            id: format!("a{:04}", state.artifact_seq),
            name: name.into(),
            rel_path: rel_path.into(),
            kind,
            mime: mime.into(),
            size,
            created_at: now_unix_ms(),
            description,
        };
        state.artifacts.push(record.clone());
        state.updated_at = now_unix_ms();
        record
    }

    /// Whether this run has already been persisted once this tick; used
    /// by the registry to debounce snapshot writes (§9 open question).
    pub fn mark_persisted(&self) {
        self.persisted_recently.store(true, Ordering::Relaxed);
    }

    pub fn take_persisted_flag(&self) -> bool {
        self.persisted_recently.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
