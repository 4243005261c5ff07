use super::*;
use std::fs;
use std::path::PathBuf;

struct FixedNames(std::vec::IntoIter<PathBuf>);

impl FixedNames {
    fn new(names: Vec<PathBuf>) -> Self {
        Self(names.into_iter())
    }
}

impl NameIter for FixedNames {
    fn next_name(&mut self) -> Option<PathBuf> {
        self.0.next()
    }
}

#[test]
fn rename_noreplace_moves_file() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    let new = dir.path().join("b");
    fs::write(&old, b"data").unwrap();

    rename_noreplace(&old, &new).unwrap();

    assert!(!old.exists());
    assert_eq!(fs::read(&new).unwrap(), b"data");
}

#[test]
fn rename_noreplace_refuses_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    let new = dir.path().join("b");
    fs::write(&old, b"data").unwrap();
    fs::write(&new, b"keep me").unwrap();

    let err = rename_noreplace(&old, &new).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    assert_eq!(fs::read(&new).unwrap(), b"keep me");
}

#[test]
fn rename_to_available_skips_taken_names() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    let taken = dir.path().join("taken");
    let free = dir.path().join("free");
    fs::write(&old, b"data").unwrap();
    fs::write(&taken, b"x").unwrap();

    let mut names = FixedNames::new(vec![taken.clone(), free.clone()]);
    let dest = rename_to_available(&old, &mut names).unwrap();

    assert_eq!(dest, free);
    assert_eq!(fs::read(&taken).unwrap(), b"x");
    assert_eq!(fs::read(&free).unwrap(), b"data");
}

#[test]
fn rename_over_itself_advances_the_iterator() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    let other = dir.path().join("b");
    fs::write(&old, b"data").unwrap();

    let mut names = FixedNames::new(vec![old.clone(), other.clone()]);
    let dest = rename_to_available(&old, &mut names).unwrap();

    assert_eq!(dest, other);
}

#[test]
fn rename_to_available_reports_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    let taken = dir.path().join("taken");
    fs::write(&old, b"data").unwrap();
    fs::write(&taken, b"x").unwrap();

    let mut names = FixedNames::new(vec![taken]);
    let err = rename_to_available(&old, &mut names).unwrap_err();

    assert!(matches!(err, WaryError::Exhausted));
    assert!(old.exists());
}

#[test]
fn rename_to_available_surfaces_other_errors() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a");
    fs::write(&old, b"data").unwrap();

    let mut names = FixedNames::new(vec![dir.path().join("no/such/dir/b")]);
    let err = rename_to_available(&old, &mut names).unwrap_err();

    assert!(matches!(err, WaryError::Io { op: "rename", .. }));
}

#[test]
fn make_available_dir_creates_first_free_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let taken = dir.path().join("taken");
    let free = dir.path().join("free");
    fs::create_dir(&taken).unwrap();

    let mut names = FixedNames::new(vec![taken, free.clone()]);
    let created = make_available_dir(&mut names).unwrap();

    assert_eq!(created, free);
    assert!(free.is_dir());
}

#[test]
fn make_available_dir_reports_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let taken = dir.path().join("taken");
    fs::create_dir(&taken).unwrap();

    let mut names = FixedNames::new(vec![taken]);
    assert!(matches!(
        make_available_dir(&mut names).unwrap_err(),
        WaryError::Exhausted
    ));
}
