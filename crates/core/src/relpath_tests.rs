use super::*;
use yare::parameterized;

#[parameterized(
    identity = { "/a/b", "/a/b" },
    trailing_slash = { "/a/b/", "/a/b" },
    dot_elements = { "/a/./b", "/a/b" },
    parent_elements = { "/a/c/../b", "/a/b" },
    double_slash = { "/a//b", "/a/b" },
    parent_above_root = { "/../a", "/a" },
    relative_parent = { "../a", "../a" },
    relative_parent_collapse = { "a/../b", "b" },
    empty_to_dot = { "", "." },
    only_dot = { ".", "." },
    root = { "/", "/" },
)]
fn clean_normalizes(input: &str, expected: &str) {
    assert_eq!(clean(Path::new(input)), PathBuf::from(expected));
}

#[test]
fn resolve_relative_path_joins_base() {
    let r = resolve(Path::new("/srv/in"), Path::new("_/journal")).unwrap();

    assert_eq!(r.path, PathBuf::from("/srv/in/_/journal"));
    assert_eq!(r.base, PathBuf::from("/srv/in"));
    assert_eq!(r.relative, PathBuf::from("_/journal"));
    assert!(r.contained());
}

#[test]
fn resolve_absolute_path_is_kept() {
    let r = resolve(Path::new("/srv/in"), Path::new("/var/archive")).unwrap();

    assert_eq!(r.path, PathBuf::from("/var/archive"));
    assert_eq!(r.relative, PathBuf::from("../../var/archive"));
    assert!(!r.contained());
}

#[test]
fn resolve_base_itself_is_contained() {
    let r = resolve(Path::new("/srv/in"), Path::new("/srv/in")).unwrap();

    assert_eq!(r.relative, PathBuf::from("."));
    assert!(r.contained());
}

#[test]
fn resolve_escaping_relative_path_is_not_contained() {
    let r = resolve(Path::new("/srv/in"), Path::new("../outside")).unwrap();

    assert_eq!(r.path, PathBuf::from("/srv/outside"));
    assert!(!r.contained());
}

#[test]
fn resolve_cleans_inner_parent_references() {
    let r = resolve(Path::new("/srv/in"), Path::new("a/../b")).unwrap();

    assert_eq!(r.relative, PathBuf::from("b"));
    assert!(r.contained());
}

#[test]
fn resolve_empty_path_fails() {
    assert_eq!(
        resolve(Path::new("/srv/in"), Path::new("")),
        Err(RelPathError::Empty)
    );
}

#[test]
fn resolve_mixed_absoluteness_fails() {
    let err = resolve(Path::new("in"), Path::new("/srv/x")).unwrap_err();
    assert!(matches!(err, RelPathError::NotRelatable { .. }));
}

#[test]
fn relative_components_iterates_elements() {
    let r = resolve(Path::new("/srv/in"), Path::new("a/b/c")).unwrap();
    let parts: Vec<_> = r
        .relative_components()
        .map(|c| c.as_os_str().to_os_string())
        .collect();

    assert_eq!(parts, vec!["a", "b", "c"]);
}
