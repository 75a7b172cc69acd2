use super::*;

fn base() -> Config {
    Config {
        host: "0.0.0.0".into(),
        port: 8080,
        data_dir: None,
        shared_repos_root: None,
        harness_workspace: None,
        env_path: None,
        git_remote: "origin".into(),
        llm_api_key: None,
        llm_base_url: None,
        tts_api_key: None,
        tts_base_url: None,
        log_format: "json".into(),
        log_level: "info".into(),
    }
}

#[test]
fn rejects_unknown_log_format() {
    let mut config = base();
    config.log_format = "xml".into();
    assert!(config.validate().is_err());
}

#[test]
fn accepts_text_log_format() {
    let mut config = base();
    config.log_format = "text".into();
    assert!(config.validate().is_ok());
}

#[test]
fn harness_workspace_defaults_under_data_dir() {
    let config = base();
    let data_dir = std::path::Path::new("/tmp/dashboard-data");
    assert_eq!(config.resolved_harness_workspace(data_dir), data_dir.join("harness").join("workspaces"));
}
