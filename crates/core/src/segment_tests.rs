use super::*;

#[test]
fn empty_text_is_never_appended() {
    let mut log = SegmentLog::new();
    assert_eq!(log.push(String::new(), 0), None);
    assert!(log.is_empty());
}

#[test]
fn seq_is_monotonic() {
    let mut log = SegmentLog::new();
    let a = log.push("a".into(), 0).expect("non-empty");
    let b = log.push("b".into(), 1).expect("non-empty");
    assert!(b > a);
}

#[test]
fn since_filters_by_marker() {
    let mut log = SegmentLog::new();
    log.push("first".into(), 0);
    let marker = log.next_seq() - 1;
    log.push("second".into(), 1);
    log.push("third".into(), 2);
    let after: Vec<_> = log.since(marker).iter().map(|s| s.text.clone()).collect();
    assert_eq!(after, vec!["second".to_owned(), "third".to_owned()]);
}

#[test]
fn caps_enforced_but_always_keeps_at_least_one() {
    let mut log = SegmentLog::new();
    for i in 0..(MAX_SEGMENTS + 50) {
        log.push(format!("segment-{i}"), i as i64);
    }
    assert!(log.len() <= MAX_SEGMENTS);
    assert!(!log.is_empty());
}
