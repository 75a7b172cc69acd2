// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn extracts_url_and_code() {
    let chunk = "Visit https://example.com/device to continue. Code: ABCD-1234-EFGH";
    let hint = extract(chunk).expect("hint present");
    assert_eq!(hint.url.as_deref(), Some("https://example.com/device"));
    assert_eq!(hint.code.as_deref(), Some("ABCD-1234-EFGH"));
}

#[test]
fn url_only() {
    let hint = extract("go to https://foo.bar/baz now").expect("hint present");
    assert_eq!(hint.url.as_deref(), Some("https://foo.bar/baz"));
    assert!(hint.code.is_none());
}

#[test]
fn code_only() {
    let hint = extract("your code is WXYZ-9876").expect("hint present");
    assert!(hint.url.is_none());
    assert_eq!(hint.code.as_deref(), Some("WXYZ-9876"));
}

#[test]
fn no_hint_returns_none() {
    assert!(extract("just some ordinary log output").is_none());
}

#[test]
fn short_groups_are_not_device_codes() {
    // only 1 group, below the required 2-5 grouping.
    assert!(extract("AB12").is_none());
}

#[test]
fn preview_truncates_to_500_chars() {
    let long = "x".repeat(1000);
    assert_eq!(preview(&long).chars().count(), 500);
}
