// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wary filesystem primitives
//!
//! Operations in this module assume the filesystem may change underneath
//! them: copies verify that the source kept its identity, renames refuse to
//! replace existing files, and directory creation never escapes its base.

mod changes;
mod copy;
mod mkdir;
mod rename;

pub use changes::{describe_changes, same_file, FileChanges};
pub use copy::{copy_vigilant, CopyOptions};
pub use mkdir::ensure_rel_dir;
pub use rename::{make_available_dir, rename_noreplace, rename_to_available};

use crate::relpath::RelPathError;
use std::path::PathBuf;
use thiserror::Error;

/// Source of candidate destination names, typically a
/// [`uniquename::Generator`](crate::uniquename::Generator).
pub trait NameIter {
    fn next_name(&mut self) -> Option<PathBuf>;
}

#[derive(Debug, Error)]
pub enum WaryError {
    #[error("file changed: {0}")]
    FileChanged(FileChanges),

    #[error("copied {copied} bytes while source has {expected} bytes")]
    ShortCopy { copied: u64, expected: u64 },

    #[error("candidate names exhausted")]
    Exhausted,

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    RelPath(#[from] RelPathError),

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WaryError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
