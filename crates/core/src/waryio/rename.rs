// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rename and create operations that never replace existing files

use super::{NameIter, WaryError};
use nix::libc;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

fn to_cstring(path: &Path) -> std::io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))
}

/// Rename `old` to `new` without replacing a file which may already exist at
/// `new`.
pub fn rename_noreplace(old: &Path, new: &Path) -> std::io::Result<()> {
    let old_c = to_cstring(old)?;
    let new_c = to_cstring(new)?;

    let rc = unsafe {
        libc::renameat2(
            libc::AT_FDCWD,
            old_c.as_ptr(),
            libc::AT_FDCWD,
            new_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Rename `old` to the first available path produced by `names`. The used
/// destination path is returned.
pub fn rename_to_available(old: &Path, names: &mut dyn NameIter) -> Result<PathBuf, WaryError> {
    while let Some(candidate) = names.next_name() {
        match rename_noreplace(old, &candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(WaryError::io("rename", candidate, e)),
        }
    }

    Err(WaryError::Exhausted)
}

/// Create a directory at the first available path produced by `names`.
pub fn make_available_dir(names: &mut dyn NameIter) -> Result<PathBuf, WaryError> {
    while let Some(candidate) = names.next_name() {
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(WaryError::io("mkdir", candidate, e)),
        }
    }

    Err(WaryError::Exhausted)
}

#[cfg(test)]
#[path = "rename_tests.rs"]
mod tests;
