// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File copy with concurrent-modification detection

use super::changes::describe_changes;
use super::WaryError;
use nix::libc;
use std::fs::OpenOptions;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Fail if the destination already exists. When disabled an existing
    /// destination is truncated instead.
    pub exclusive: bool,

    /// Apply the source permission bits to the destination after copying.
    pub preserve_permissions: bool,

    /// fsync the destination before returning.
    pub sync_dest: bool,

    /// Mode bits for a newly created destination, subject to the umask.
    pub dest_mode: u32,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            exclusive: true,
            preserve_permissions: true,
            sync_dest: false,
            dest_mode: 0o666,
        }
    }
}

/// Create an exact file copy. The operation fails if the source file is
/// modified concurrently. Neither side follows symlinks.
pub fn copy_vigilant(source: &Path, dest: &Path, opts: &CopyOptions) -> Result<(), WaryError> {
    let mut src = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW)
        .open(source)
        .map_err(|e| WaryError::io("open", source, e))?;

    let mut dest_opts = OpenOptions::new();
    dest_opts
        .write(true)
        .mode(opts.dest_mode)
        .custom_flags(libc::O_NOFOLLOW);
    if opts.exclusive {
        dest_opts.create_new(true);
    } else {
        dest_opts.create(true).truncate(true);
    }

    let mut dst = dest_opts
        .open(dest)
        .map_err(|e| WaryError::io("open", dest, e))?;

    let stat_before = src
        .metadata()
        .map_err(|e| WaryError::io("stat", source, e))?;

    let copied = std::io::copy(&mut src, &mut dst).map_err(|e| WaryError::io("copy", source, e))?;

    let stat_after = src
        .metadata()
        .map_err(|e| WaryError::io("stat", source, e))?;

    describe_changes(&stat_before, &stat_after).into_result()?;

    if copied != stat_before.len() {
        return Err(WaryError::ShortCopy {
            copied,
            expected: stat_before.len(),
        });
    }

    if opts.preserve_permissions {
        let perm = PermissionsExt::from_mode(stat_before.permissions().mode() & 0o777);
        dst.set_permissions(perm)
            .map_err(|e| WaryError::io("chmod", dest, e))?;
    }

    if opts.sync_dest {
        dst.sync_all().map_err(|e| WaryError::io("fsync", dest, e))?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "copy_tests.rs"]
mod tests;
