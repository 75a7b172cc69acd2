use super::*;

#[test]
fn parses_quoted_and_unquoted_values() {
    let contents = "export A=plain\nB='single quoted'\nC=\"double\\nquoted\"\n# comment\nD=value # trailing comment\n";
    let parsed = parse(contents);
    assert_eq!(parsed.get("A").map(String::as_str), Some("plain"));
    assert_eq!(parsed.get("B").map(String::as_str), Some("single quoted"));
    assert_eq!(parsed.get("C").map(String::as_str), Some("double\nquoted"));
    assert_eq!(parsed.get("D").map(String::as_str), Some("value"));
}

#[test]
fn rejects_invalid_keys() {
    let contents = "lowercase=nope\n1BAD=nope\nGOOD_1=yes\n";
    let parsed = parse(contents);
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.get("GOOD_1").map(String::as_str), Some("yes"));
}

#[test]
fn round_trip_any_valid_map() {
    let mut values = BTreeMap::new();
    values.insert("API_KEY".to_owned(), "it's a 'secret'".to_owned());
    values.insert("SIMPLE".to_owned(), "plain-value".to_owned());
    let rendered = render(&values);
    let parsed = parse(&rendered);
    assert_eq!(parsed, values);
}

#[test]
fn save_then_load_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("keys.env");
    let mut values = BTreeMap::new();
    values.insert("FOO".to_owned(), "bar".to_owned());
    save(&path, &values).expect("save");
    let loaded = load(&path).expect("load");
    assert_eq!(loaded, values);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

#[test]
fn load_missing_file_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("does-not-exist.env");
    let loaded = load(&path).expect("load");
    assert!(loaded.is_empty());
}
