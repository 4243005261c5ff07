// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unique file name generation
//!
//! Produces a lazy sequence of candidate names derived from an original
//! name: first the original (optionally prefixed with the current time),
//! then variants decorated with a parenthesized timestamp or random suffix.
//! Every candidate after the first fits within the filesystem name limit,
//! truncated on grapheme-cluster boundaries so the result stays valid UTF-8.

use crate::clock::{Clock, SystemClock};
use crate::waryio::NameIter;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

const NAME_MAX: usize = 255;

fn decoration_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"\s+\([0-9a-fA-F]+\)\s*").unwrap_or_else(|e| panic!("{e}"))
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("path {} contains no name", .0.display())]
    NoName(PathBuf),
    #[error("non-UTF-8 file name: {}", .0.display())]
    InvalidUtf8(PathBuf),
    #[error("missing timestamp: {}", .0.display())]
    MissingTime(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Prepend the current time to every candidate, including the original
    /// name.
    pub time_prefix_enabled: bool,
    pub time_prefix_layout: String,
    pub time_prefix_supported_layouts: Vec<String>,

    /// Keep the extension at the end of decorated names.
    pub before_extension: bool,
    pub max_extension_length: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            time_prefix_enabled: true,
            time_prefix_layout: "%Y-%m-%dT%H%M%S".to_string(),
            time_prefix_supported_layouts: vec![
                "%Y-%m-%dT%H%M%S%z".to_string(),
                "%Y-%m-%dT%H%M%S".to_string(),
            ],
            before_extension: true,
            max_extension_length: 10,
        }
    }
}

/// Lazy sequence of candidate names for one original path.
pub struct Generator {
    dir: PathBuf,
    time_prefix: String,
    prefix: String,
    suffix: String,
    original_name: Option<String>,
    time_suffix: Option<DateTime<Local>>,
    rand: Box<dyn FnMut() -> u32 + Send>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("dir", &self.dir)
            .field("time_prefix", &self.time_prefix)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("original_name", &self.original_name)
            .field("time_suffix", &self.time_suffix)
            .finish()
    }
}

impl Generator {
    pub fn new(path: &Path, opts: &Options) -> Result<Self, NameError> {
        Self::with_now(path, opts, SystemClock.now_local())
    }

    pub fn with_now(path: &Path, opts: &Options, now: DateTime<Local>) -> Result<Self, NameError> {
        Self::with_runtime(path, opts, now, Box::new(rand::random::<u32>))
    }

    /// Construct with explicit time and randomness, primarily for tests.
    pub fn with_runtime(
        path: &Path,
        opts: &Options,
        now: DateTime<Local>,
        rand: Box<dyn FnMut() -> u32 + Send>,
    ) -> Result<Self, NameError> {
        let name = path
            .file_name()
            .ok_or_else(|| NameError::NoName(path.to_path_buf()))?;
        let name = name
            .to_str()
            .ok_or_else(|| NameError::InvalidUtf8(path.to_path_buf()))?
            .to_string();

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut prefix = name.clone();
        let mut suffix = String::new();

        if opts.before_extension && opts.max_extension_length > 0 {
            if let Some(pos) = prefix.rfind('.') {
                let ext_len = prefix.len() - pos;
                // A leading dot alone is a hidden-file marker, not an
                // extension.
                if pos > 0 && ext_len < opts.max_extension_length {
                    suffix = prefix.split_off(pos);
                }
            }
        }

        prefix = decoration_re().replace_all(&prefix, "").into_owned();

        let mut g = Self {
            dir,
            time_prefix: String::new(),
            prefix,
            suffix,
            original_name: Some(name),
            time_suffix: None,
            rand,
        };

        if opts.time_prefix_enabled {
            let formatted = now.format(&opts.time_prefix_layout).to_string();
            g.time_prefix = format!("{} ", formatted.trim_end());
        } else {
            g.time_suffix = Some(now);
        }

        Ok(g)
    }
}

impl NameIter for Generator {
    fn next_name(&mut self) -> Option<PathBuf> {
        let name = if let Some(original) = self.original_name.take() {
            format!("{}{}", self.time_prefix, original)
        } else {
            let uniq = match self.time_suffix.take() {
                Some(ts) => ts.format("%Y%m%d%H%M%S").to_string(),
                None => format!("{:x}", (self.rand)()),
            };

            combine_with_max_len(
                &format!("{}{}", self.time_prefix, self.prefix),
                &format!(" ({})", uniq),
                &self.suffix,
                NAME_MAX,
            )
        };

        Some(self.dir.join(name))
    }
}

/// Combine the three parts into a string of at most `max_bytes` bytes of
/// UTF-8. The prefix is cut off at the end first and, if that does not
/// suffice, the suffix at the beginning. The middle part must always fit.
fn combine_with_max_len(prefix: &str, middle: &str, suffix: &str, max_bytes: usize) -> String {
    assert!(
        middle.len() <= max_bytes,
        "middle part {:?} longer than {} bytes",
        middle,
        max_bytes
    );

    let mut kept_prefix = "";
    for (pos, grapheme) in prefix.grapheme_indices(true) {
        let end = pos + grapheme.len();
        if end + middle.len() + suffix.len() > max_bytes {
            break;
        }
        kept_prefix = &prefix[..end];
    }

    let mut kept_suffix = "";
    for (pos, _) in suffix.grapheme_indices(true) {
        if kept_prefix.len() + middle.len() + (suffix.len() - pos) <= max_bytes {
            kept_suffix = &suffix[pos..];
            break;
        }
    }

    format!("{}{}{}", kept_prefix, middle, kept_suffix)
}

/// Parse the timestamp embedded in the leading token of a decorated name.
pub fn extract_time(path: &Path, opts: &Options) -> Result<DateTime<Local>, NameError> {
    let name = path
        .file_name()
        .ok_or_else(|| NameError::NoName(path.to_path_buf()))?
        .to_str()
        .ok_or_else(|| NameError::InvalidUtf8(path.to_path_buf()))?;

    let name = name.trim_start();
    let token = name
        .split_whitespace()
        .next()
        .unwrap_or(name);

    for layout in &opts.time_prefix_supported_layouts {
        if layout.contains("%z") {
            if let Ok(ts) = DateTime::parse_from_str(token, layout) {
                return Ok(ts.with_timezone(&Local));
            }
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(token, layout) {
            if let Some(ts) = Local.from_local_datetime(&naive).earliest() {
                return Ok(ts);
            }
        }
    }

    Err(NameError::MissingTime(path.to_path_buf()))
}

#[cfg(test)]
#[path = "uniquename_tests.rs"]
mod tests;
