use super::*;

#[test]
fn shell_quote_wraps_plain_values() {
    assert_eq!(shell_quote("true"), "'true'");
}

#[test]
fn shell_quote_escapes_embedded_single_quotes() {
    assert_eq!(shell_quote("it's"), "'it'\\''s'");
}

#[test]
fn push_capped_bytes_trims_oldest_on_overflow() {
    let mut buf = Vec::new();
    push_capped_bytes(&mut buf, b"hello ", 5);
    push_capped_bytes(&mut buf, b"world", 5);
    assert_eq!(buf.len(), 5);
    assert_eq!(&buf, b"world");
}

#[test]
fn push_capped_str_respects_char_boundaries() {
    let mut buf = String::new();
    push_capped_str(&mut buf, "caf\u{e9}", 3);
    assert!(buf.is_char_boundary(0));
    assert!(buf.chars().count() <= 3);
}

#[test]
fn tail_chars_keeps_suffix() {
    assert_eq!(tail_chars("abcdef", 3), "def");
    assert_eq!(tail_chars("ab", 3), "ab");
}
