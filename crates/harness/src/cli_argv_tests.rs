use super::*;

#[test]
fn exec_argv_ends_with_prompt_text() {
    let argv = exec_argv(ProviderBinary::Codex, "do the thing");
    assert_eq!(argv.last().map(String::as_str), Some("do the thing"));
    assert_eq!(argv[0], "codex");
}

#[test]
fn each_provider_gets_a_bypass_flag() {
    for provider in [ProviderBinary::Codex, ProviderBinary::Claude, ProviderBinary::Gemini] {
        let argv = exec_argv(provider, "x");
        assert!(argv.len() >= 3);
    }
}
