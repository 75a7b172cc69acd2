use super::*;
use crate::run::TaskInput;

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

fn config(root: &std::path::Path) -> HarnessConfig {
    HarnessConfig {
        shared_repos_root: root.join("shared-repos"),
        workspace_root: root.join("workspace"),
        artifacts_root: root.join("artifacts"),
        runs_root: root.join("runs"),
        transcripts_root: root.join("transcripts"),
        remote: "origin".into(),
    }
}

#[tokio::test]
async fn persist_then_recover_from_disk_roundtrips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = HarnessRegistry::new(config(dir.path()), vec![], None, None);

    let run = HarnessRun::new("run-disk-1".into(), sample_task());
    registry.persist(&run).await;

    // Not in the in-memory map, so `get` must recover it from disk.
    let recovered = registry.get("run-disk-1").await.expect("recovered");
    assert_eq!(recovered.id, "run-disk-1");
}

#[tokio::test]
async fn get_unknown_run_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = HarnessRegistry::new(config(dir.path()), vec![], None, None);
    assert!(registry.get("does-not-exist").await.is_err());
}

#[tokio::test]
async fn list_runs_merges_disk_snapshots_uniquely() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = HarnessRegistry::new(config(dir.path()), vec![], None, None);

    let on_disk = HarnessRun::new("run-a".into(), sample_task());
    registry.persist(&on_disk).await;

    let listed = registry.list_runs().await;
    assert_eq!(listed.iter().filter(|s| s.id == "run-a").count(), 1);
}
