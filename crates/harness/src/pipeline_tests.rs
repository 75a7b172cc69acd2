use super::*;
use crate::run::{HarnessRun, TaskInput};

fn sample_task() -> TaskInput {
    TaskInput {
        title: "Fix the thing: urgently!!".into(),
        repo_path: "r1".into(),
        objective: "make it work".into(),
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

#[test]
fn tail_keeps_only_the_last_n_chars() {
    assert_eq!(tail("hello world", 5), "world");
    assert_eq!(tail("hi", 5), "hi");
}

#[tokio::test]
async fn commit_message_truncates_long_subject_and_names_run() {
    let run = HarnessRun::new("run-commit-1".into(), sample_task());
    let state = run.snapshot().await;
    let msg = commit_message(&state, "harness/2026-07-28/fix-the-thing-abc123");
    let subject = msg.lines().next().expect("subject line");
    assert!(subject.len() <= 72);
    assert!(msg.contains("run-commit-1"));
    assert!(msg.contains("harness/2026-07-28/fix-the-thing-abc123"));
    assert!(msg.contains("Source: harness"));
}

#[tokio::test]
async fn commit_message_truncates_multibyte_title_without_panicking() {
    let mut task = sample_task();
    // Pad the prefix so the 72-char cut point lands inside a multibyte run
    // of 3-byte characters, which would straddle a byte index that is not
    // a UTF-8 char boundary under a byte-index truncate.
    task.title = format!("{}{}", "x".repeat(60), "日".repeat(30));
    let run = HarnessRun::new("run-commit-2".into(), task);
    let state = run.snapshot().await;

    let msg = commit_message(&state, "harness/2026-07-28/unicode-title-abc123");

    let subject = msg.lines().next().expect("subject line");
    assert_eq!(subject.chars().count(), 72);
}

#[test]
fn job_token_is_independent_but_cancellable_from_run() {
    let run = HarnessRun::new("run-token-1".into(), sample_task());
    let token = job_token(&run);
    assert!(!token.is_cancelled());
    run.request_cancel();
    assert!(token.is_cancelled());
}
