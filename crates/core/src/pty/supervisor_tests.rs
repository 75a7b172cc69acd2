use std::collections::HashMap;
use std::time::Duration;

use super::*;

fn transcript_dir() -> Transcript {
    let dir = tempfile::tempdir().expect("tempdir").keep();
    Transcript::new(dir, "test-owner".to_owned(), "main".to_owned())
}

#[tokio::test]
async fn spawn_echo_and_observe_output() {
    let channel = Channel::new("main", 4096, transcript_dir(), 80, 24);
    let mut output = channel.subscribe_output();
    channel
        .spawn(&["/bin/echo".to_owned(), "hello-supervisor".to_owned()], std::path::Path::new("/"), &HashMap::new())
        .await
        .expect("spawn should succeed");

    let received = tokio::time::timeout(Duration::from_secs(5), output.recv())
        .await
        .expect("should receive output before timeout")
        .expect("channel should not lag/close immediately");
    assert!(String::from_utf8_lossy(&received).contains("hello-supervisor"));
}

#[tokio::test]
async fn write_fails_when_not_running() {
    let channel = Channel::new("main", 4096, transcript_dir(), 80, 24);
    let result = channel.write(b"hi").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn snapshot_then_tail_equals_full_stream() {
    let channel = Channel::new("main", 4096, transcript_dir(), 80, 24);
    channel.push_sys("line one").await;

    let (snapshot, mut output) = channel.subscribe_output_and_dump().await;
    channel.push_sys("line two").await;

    let tail = tokio::time::timeout(Duration::from_secs(5), output.recv())
        .await
        .expect("should receive the post-subscribe chunk before timeout")
        .expect("channel should not lag/close immediately");

    let mut full = snapshot;
    full.extend_from_slice(&tail);
    let full = String::from_utf8_lossy(&full);
    assert!(full.contains("line one"));
    assert!(full.contains("line two"));
    assert_eq!(full.matches("line one").count(), 1, "snapshot+tail must not duplicate the pre-subscribe chunk");
    assert_eq!(full.matches("line two").count(), 1, "snapshot+tail must not drop the post-subscribe chunk");
}

#[tokio::test]
async fn stop_resolves_after_child_exits() {
    let channel = Channel::new("main", 4096, transcript_dir(), 80, 24);
    channel
        .spawn(&["/bin/sleep".to_owned(), "0.2".to_owned()], std::path::Path::new("/"), &HashMap::new())
        .await
        .expect("spawn should succeed");

    tokio::time::timeout(Duration::from_secs(5), channel.stop())
        .await
        .expect("stop should resolve before the hard deadline");
}
