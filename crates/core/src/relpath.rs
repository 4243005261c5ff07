// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexical path resolution and containment checks
//!
//! Purely lexical: nothing here touches the filesystem, so symlinks are not
//! resolved. Containment is decided on the cleaned relative path alone.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelPathError {
    #[error("cannot make {} relative to {}", .path.display(), .base.display())]
    NotRelatable { base: PathBuf, path: PathBuf },
    #[error("empty path")]
    Empty,
}

/// Lexically clean a path: collapse `.` and parent references, drop repeated
/// separators. The result is `.` for an empty relative input.
pub fn clean(path: &Path) -> PathBuf {
    let mut rooted = false;
    let mut out: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::RootDir => rooted = true,
            Component::Prefix(p) => out.push(p.as_os_str().to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.last(), Some(last) if last != "..");
                if popped {
                    out.pop();
                } else if !rooted {
                    out.push(OsString::from(".."));
                }
            }
            Component::Normal(name) => out.push(name.to_os_string()),
        }
    }

    let mut result = PathBuf::new();
    if rooted {
        result.push("/");
    }
    for part in out {
        result.push(part);
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }

    result
}

/// The outcome of resolving a path against a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Cleaned path to the file or directory.
    pub path: PathBuf,

    /// Cleaned base directory.
    pub base: PathBuf,

    /// Base-relative path. May contain `..` components.
    pub relative: PathBuf,
}

impl Resolved {
    /// Whether the path is fully contained within the base directory.
    pub fn contained(&self) -> bool {
        let mut components = self.relative.components().peekable();

        if components.peek().is_none() {
            return false;
        }

        components.all(|c| !matches!(c, Component::ParentDir))
    }

    /// Components of the base-relative path.
    pub fn relative_components(&self) -> impl Iterator<Item = Component<'_>> {
        self.relative.components()
    }
}

/// Resolve `path` against `base`. Absolute paths are kept as-is (cleaned);
/// relative paths are joined onto the base.
pub fn resolve(base: &Path, path: &Path) -> Result<Resolved, RelPathError> {
    if path.as_os_str().is_empty() {
        return Err(RelPathError::Empty);
    }

    let base = clean(base);
    let target = if path.is_absolute() {
        clean(path)
    } else {
        clean(&base.join(path))
    };

    let relative = rel(&base, &target)?;

    Ok(Resolved {
        path: target,
        base,
        relative,
    })
}

/// Lexical equivalent of computing the path from `base` to `target`.
fn rel(base: &Path, target: &Path) -> Result<PathBuf, RelPathError> {
    if base.is_absolute() != target.is_absolute() {
        return Err(RelPathError::NotRelatable {
            base: base.to_path_buf(),
            path: target.to_path_buf(),
        });
    }

    let mut base_parts = base.components().peekable();
    let mut target_parts = target.components().peekable();

    // Skip the shared prefix.
    while let (Some(b), Some(t)) = (base_parts.peek(), target_parts.peek()) {
        if b != t {
            break;
        }
        base_parts.next();
        target_parts.next();
    }

    let mut relative = PathBuf::new();
    for component in base_parts {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Stepping back out of an unknown parent is not expressible
                // lexically.
                return Err(RelPathError::NotRelatable {
                    base: base.to_path_buf(),
                    path: target.to_path_buf(),
                });
            }
            _ => relative.push(".."),
        }
    }
    for component in target_parts {
        relative.push(component);
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }

    Ok(relative)
}

#[cfg(test)]
#[path = "relpath_tests.rs"]
mod tests;
