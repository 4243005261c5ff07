// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contained directory creation

use super::WaryError;
use crate::relpath;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

/// Create a directory if and only if it resolves to a subdirectory of
/// `base`. The base directory must exist. `path` may be absolute.
///
/// On success the cleaned path to the directory is returned. If `path` does
/// not resolve to a subdirectory of `base` nothing is created and the cleaned
/// path is merely returned.
pub fn ensure_rel_dir(base: &Path, path: &Path, mode: u32) -> Result<PathBuf, WaryError> {
    let resolved = relpath::resolve(base, path)?;

    if !resolved.contained() {
        return Ok(resolved.path);
    }

    let mut current = resolved.base.clone();

    for component in resolved.relative_components() {
        current.push(component);

        match current.metadata() {
            Ok(st) if st.is_dir() => continue,
            Ok(_) => {
                return Err(WaryError::NotADirectory { path: current });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(WaryError::io("stat", current, e)),
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.mode(mode);

        if let Err(e) = builder.create(&current) {
            // The directory may have been created concurrently.
            let created_meanwhile = e.kind() == std::io::ErrorKind::AlreadyExists
                && current.metadata().map(|st| st.is_dir()).unwrap_or(false);

            if !created_meanwhile {
                return Err(WaryError::io("mkdir", current, e));
            }
        }
    }

    Ok(resolved.path)
}

#[cfg(test)]
#[path = "mkdir_tests.rs"]
mod tests;
