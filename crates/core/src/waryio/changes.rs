// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stat-based change detection

use super::WaryError;
use std::fmt;
use std::fs::{FileType, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Differences detected between two stat results.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileChanges(Vec<String>);

impl FileChanges {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// `Ok(())` when no changes were detected, `WaryError::FileChanged`
    /// otherwise.
    pub fn into_result(self) -> Result<(), WaryError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(WaryError::FileChanged(self))
        }
    }
}

impl fmt::Display for FileChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

fn type_name(t: FileType) -> &'static str {
    if t.is_file() {
        "regular file"
    } else if t.is_dir() {
        "directory"
    } else if t.is_symlink() {
        "symlink"
    } else {
        "special file"
    }
}

/// Describe the changes between two stat results of what should be the same
/// unmodified file. An empty result means "equivalent".
pub fn describe_changes(a: &Metadata, b: &Metadata) -> FileChanges {
    let mut result = Vec::new();

    if a.dev() != b.dev() || a.ino() != b.ino() {
        result.push("moved or replaced (not the same file)".to_string());
    }

    if a.file_type() != b.file_type() {
        result.push(format!(
            "type changed ({} != {})",
            type_name(a.file_type()),
            type_name(b.file_type())
        ));
    }

    if a.size() != b.size() {
        result.push(format!("size changed ({} != {})", a.size(), b.size()));
    }

    if (a.mtime(), a.mtime_nsec()) != (b.mtime(), b.mtime_nsec()) {
        result.push(format!(
            "modification time changed ({}.{:09} != {}.{:09})",
            a.mtime(),
            a.mtime_nsec(),
            b.mtime(),
            b.mtime_nsec()
        ));
    }

    FileChanges(result)
}

/// Whether two paths point to the same file. Symlinks are not followed.
pub fn same_file(a: &Path, b: &Path) -> Result<bool, WaryError> {
    let fi_a = a
        .symlink_metadata()
        .map_err(|e| WaryError::io("lstat", a, e))?;
    let fi_b = b
        .symlink_metadata()
        .map_err(|e| WaryError::io("lstat", b, e))?;

    Ok(fi_a.dev() == fi_b.dev() && fi_a.ino() == fi_b.ino())
}

#[cfg(test)]
#[path = "changes_tests.rs"]
mod tests;
