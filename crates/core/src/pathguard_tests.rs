use super::*;

#[test]
fn accepts_path_inside_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sub = dir.path().join("inner");
    std::fs::create_dir(&sub).expect("mkdir");
    let result = contain(dir.path(), &sub);
    assert!(result.is_ok());
}

#[test]
fn rejects_sibling_with_shared_string_prefix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("a-b");
    let sibling = dir.path().join("a-bc");
    std::fs::create_dir(&root).expect("mkdir");
    std::fs::create_dir(&sibling).expect("mkdir");
    let result = contain(&root, &sibling);
    assert!(result.is_err());
}

#[test]
fn lexical_containment_rejects_dotdot_escape() {
    let root = Path::new("/srv/harness/artifacts/run-1");
    let escape = PathBuf::from("../../../etc/passwd");
    let result = contain_lexical(root, &escape);
    assert!(result.is_err());
}

#[test]
fn lexical_containment_accepts_relative_subpath() {
    let root = Path::new("/srv/harness/artifacts/run-1");
    let ok = PathBuf::from("summary/final-summary.txt");
    let result = contain_lexical(root, &ok).expect("should be contained");
    assert_eq!(result, root.join("summary/final-summary.txt"));
}
