use super::*;

fn sample_task() -> TaskInput {
    TaskInput {
        title: "t".into(),
        repo_path: "r1".into(),
        objective: "o".into(),
        success_criteria: vec![],
        constraints: vec![],
        base_branch: String::new(),
        subtask_count: 0,
        verification_commands: vec![],
        browser_scenarios: vec![],
        subtask_prompts: vec![],
        persona_mode: "selected".into(),
        persona_id: None,
    }
}

#[tokio::test]
async fn new_run_starts_with_all_stages_pending() {
    let run = HarnessRun::new("run-1".into(), sample_task());
    let state = run.snapshot().await;
    assert_eq!(state.status, RunStatus::Created);
    assert!(state.stages.iter().all(|s| s.status == StageStatus::Pending));
}

#[tokio::test]
async fn stage_lifecycle_completes_in_order() {
    let run = HarnessRun::new("run-2".into(), sample_task());
    run.mark_running().await;
    run.begin_stage(StageName::Init).await;
    run.complete_stage(StageName::Init, None).await;

    let state = run.snapshot().await;
    let init = state.stages.iter().find(|s| s.name == StageName::Init).expect("init stage");
    assert_eq!(init.status, StageStatus::Completed);
    assert!(init.started_at.is_some());
    assert!(init.finished_at.is_some());
}

#[tokio::test]
async fn failing_a_stage_fails_the_run_and_records_error() {
    let run = HarnessRun::new("run-3".into(), sample_task());
    run.mark_running().await;
    run.begin_stage(StageName::WorktreePrepare).await;
    run.fail_stage(StageName::WorktreePrepare, "3 uncommitted files").await;

    let state = run.snapshot().await;
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.error.as_deref(), Some("3 uncommitted files"));
    let stage = state.stages.iter().find(|s| s.name == StageName::WorktreePrepare).expect("stage");
    assert_eq!(stage.status, StageStatus::Failed);
}

#[tokio::test]
async fn skip_stage_records_detail() {
    let run = HarnessRun::new("run-4".into(), sample_task());
    run.begin_stage(StageName::SubtaskFanout).await;
    run.skip_stage(StageName::SubtaskFanout, "subtaskCount == 0").await;

    let state = run.snapshot().await;
    let stage = state.stages.iter().find(|s| s.name == StageName::SubtaskFanout).expect("stage");
    assert_eq!(stage.status, StageStatus::Skipped);
    assert_eq!(stage.detail.as_deref(), Some("subtaskCount == 0"));
}

#[test]
fn browser_scenario_timeout_clamps_to_bounds() {
    let mut scenario = BrowserScenario {
        name: "s".into(),
        url: "http://x".into(),
        timeout_secs: 0,
        wait_selector: None,
        wait_text: None,
        fill: vec![],
        click: vec![],
    };
    assert_eq!(scenario.clamped_timeout_secs(), 1);
    scenario.timeout_secs = 999;
    assert_eq!(scenario.clamped_timeout_secs(), 60);
}

#[test]
fn cancellation_flag_round_trips() {
    let run = HarnessRun::new("run-5".into(), sample_task());
    assert!(!run.is_cancel_requested());
    run.request_cancel();
    assert!(run.is_cancel_requested());
}
