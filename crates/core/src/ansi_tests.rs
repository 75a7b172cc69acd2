use super::*;

#[test]
fn strips_csi_sequences() {
    let raw = b"\x1b[31mred\x1b[0m plain";
    assert_eq!(strip(raw), "red plain");
}

#[test]
fn strips_osc_terminated_by_bel() {
    let raw = b"\x1b]0;title\x07rest";
    assert_eq!(strip(raw), "rest");
}

#[test]
fn strips_osc_terminated_by_st() {
    let raw = b"\x1b]0;title\x1b\\rest";
    assert_eq!(strip(raw), "rest");
}

#[test]
fn strips_two_byte_escape() {
    let raw = b"a\x1bMb";
    assert_eq!(strip(raw), "ab");
}

#[test]
fn removes_backspace() {
    let raw = b"ab\x08c";
    assert_eq!(strip(raw), "ac");
}

#[test]
fn bare_cr_becomes_lf_but_crlf_is_preserved() {
    assert_eq!(strip(b"a\rb"), "a\nb");
    assert_eq!(strip(b"a\r\nb"), "a\r\nb");
}

#[test]
fn no_escape_byte_remains() {
    let raw = b"\x1b[1;32mhello\x1b[0m\x1b]2;t\x07world\x1bZdone";
    let stripped = strip(raw);
    assert!(!stripped.as_bytes().contains(&0x1B));
    assert_eq!(stripped, "helloworlddone");
}

#[test]
fn truncated_escape_at_end_of_stream_does_not_hang() {
    let raw = b"abc\x1b[31";
    let stripped = strip(raw);
    assert_eq!(stripped, "abc");
}
