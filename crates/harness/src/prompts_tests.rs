use super::*;
use crate::run::HarnessRun;

fn sample_task() -> TaskInput {
    TaskInput {
        title: "Fix bug".into(),
        repo_path: "r1".into(),
        objective: "Fix the login bug".into(),
        success_criteria: vec!["login works".into()],
        constraints: vec!["no new deps".into()],
        base_branch: String::new(),
        subtask_count: 2,
        verification_commands: vec!["true".into()],
        browser_scenarios: vec![],
        subtask_prompts: vec![Some("custom prompt".into()), None],
        persona_mode: "selected".into(),
        persona_id: None,
    }
}

#[tokio::test]
async fn task_spec_includes_objective_and_criteria() {
    let run = HarnessRun::new("run-1".into(), sample_task());
    let state = run.snapshot().await;
    let doc = task_spec_md(&state, None);
    assert!(doc.contains("Fix the login bug"));
    assert!(doc.contains("login works"));
    assert!(doc.contains("no new deps"));
}

#[test]
fn subtask_prompt_uses_explicit_override_when_present() {
    let task = sample_task();
    assert_eq!(subtask_prompt(&task, 1), "custom prompt");
}

#[test]
fn subtask_prompt_falls_back_to_generated_template() {
    let task = sample_task();
    let prompt = subtask_prompt(&task, 2);
    assert!(prompt.contains("Fix the login bug"));
    assert!(prompt.contains("subtask 2"));
}

#[test]
fn repair_prompt_includes_reason() {
    let prompt = repair_prompt("command `false` exited 1");
    assert!(prompt.contains("command `false` exited 1"));
}
