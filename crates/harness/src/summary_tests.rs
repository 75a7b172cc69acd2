use super::*;
use crate::run::{HarnessRun, TaskInput};

fn sample_task() -> TaskInput {
    TaskInput {
        title: "Add widget".into(),
        repo_path: "r1".into(),
        objective: "o".into(),
        success_criteria: vec![],
        constraints: vec![],
        base_branch: String::new(),
        subtask_count: 0,
        verification_commands: vec!["cargo test".into()],
        browser_scenarios: vec![],
        subtask_prompts: vec![],
        persona_mode: "selected".into(),
        persona_id: None,
    }
}

#[tokio::test]
async fn deterministic_summary_includes_title_and_status() {
    let run = HarnessRun::new("run-1".into(), sample_task());
    let state = run.snapshot().await;
    let text = build_summary(&state);
    assert!(text.contains("Add widget"));
    assert!(text.contains("Status"));
    assert!(text.contains("Verification commands: 1"));
}

#[tokio::test]
async fn summary_notes_first_failed_stage() {
    let run = HarnessRun::new("run-2".into(), sample_task());
    run.begin_stage(crate::run::StageName::Init).await;
    run.fail_stage(crate::run::StageName::Init, "boom").await;
    let state = run.snapshot().await;
    let text = build_summary(&state);
    assert!(text.contains("First failed stage: init"));
    assert!(text.contains("boom"));
}
