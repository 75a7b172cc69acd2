use super::*;

#[test]
fn mime_inference_covers_known_suffixes() {
    assert_eq!(mime_for("a.json"), "application/json");
    assert_eq!(mime_for("a.md"), "text/markdown");
    assert_eq!(mime_for("a.png"), "image/png");
    assert_eq!(mime_for("a.bin"), "application/octet-stream");
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ArtifactStore::new(dir.path().to_path_buf());
    store.write_text("docs/notes.md", "hello").await.expect("write");
    let read = store.read_text("docs/notes.md").await.expect("read");
    assert_eq!(read, "hello");
}

#[tokio::test]
async fn escaping_path_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ArtifactStore::new(dir.path().to_path_buf());
    let err = store.write_text("../escape.txt", "x").await;
    assert!(err.is_err());
}
