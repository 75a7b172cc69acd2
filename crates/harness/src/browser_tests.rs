use super::*;

#[test]
fn detect_browser_executable_does_not_panic() {
    // No assertion on the result: whether a browser is installed depends
    // on the host running this test. This only guards against a panic
    // in the PATH-scanning logic itself.
    let _ = detect_browser_executable();
}
