// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler configuration
//!
//! Handlers are declared in a TOML file as `[[handler]]` tables. Every field
//! has a default so a minimal declaration only needs `name`, `path` and
//! `command`.

use crate::relpath;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    #[error("handler {handler:?}: {message}")]
    Invalid { handler: String, message: String },
    #[error("duplicate handler name {0:?}")]
    DuplicateName(String),
}

/// Configuration for a single handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    /// Name the notification transport addresses this handler by.
    pub name: String,

    /// Root directory observed for changes. Must be absolute.
    pub path: PathBuf,

    /// Command executed when file changes are detected. Arguments appear in
    /// log files and must not contain confidential information.
    pub command: Vec<String>,

    /// Timeout for one command execution.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Observe the root directory recursively (excluding the infrastructure
    /// directories).
    pub recursive: bool,

    /// Whether to process files with names starting with a dot.
    pub include_hidden: bool,

    /// Minimum file size for running the command. Zero disables the check.
    pub min_size_bytes: u64,

    /// Maximum file size for running the command. Zero disables the check.
    pub max_size_bytes: u64,

    /// Amount of time the filesystem should be idle before the notification
    /// transport dispatches events.
    #[serde(with = "humantime_serde")]
    pub settle_duration: Duration,

    /// Number of times a failing command is retried. Zero makes the first
    /// failure permanent.
    pub retry_count: u32,

    /// Delay before the first retry. A small random amount of fuzz is always
    /// applied.
    #[serde(with = "humantime_serde")]
    pub retry_delay_initial: Duration,

    /// Backoff factor applied between attempts after the first retry. Use 1
    /// to always use the same delay.
    pub retry_delay_factor: f64,

    /// Upper bound on the delay between retries. Zero disables the cap.
    #[serde(with = "humantime_serde")]
    pub retry_delay_max: Duration,

    /// Directory receiving journal entries, resolved relative to `path`.
    pub journal_dir: PathBuf,

    /// How long to keep journal entries.
    #[serde(with = "humantime_serde")]
    pub journal_retention: Duration,

    /// Directory receiving files whose processing succeeded.
    pub success_dir: PathBuf,

    /// Directory receiving files whose processing failed.
    pub failure_dir: PathBuf,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: PathBuf::new(),
            command: Vec::new(),
            timeout: Duration::from_secs(60 * 60),
            recursive: false,
            include_hidden: false,
            min_size_bytes: 0,
            max_size_bytes: 0,
            settle_duration: Duration::from_secs(1),
            retry_count: 2,
            retry_delay_initial: Duration::from_secs(15 * 60),
            retry_delay_factor: 1.5,
            retry_delay_max: Duration::from_secs(60 * 60),
            journal_dir: PathBuf::from("_/journal"),
            journal_retention: Duration::from_secs(7 * 24 * 60 * 60),
            success_dir: PathBuf::from("_/success"),
            failure_dir: PathBuf::from("_/failure"),
        }
    }
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: String| ConfigError::Invalid {
            handler: self.name.clone(),
            message,
        };

        if self.name.is_empty() {
            return Err(fail("name must not be empty".to_string()));
        }

        if self.path.as_os_str().is_empty() {
            return Err(fail("path must not be empty".to_string()));
        }

        if !self.path.is_absolute() {
            return Err(fail(format!(
                "path must be absolute: {}",
                self.path.display()
            )));
        }

        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(fail("command must not be empty".to_string()));
        }

        if self.timeout.is_zero() {
            return Err(fail("timeout must be positive".to_string()));
        }

        if self.retry_delay_initial.is_zero() {
            return Err(fail("retry_delay_initial must be positive".to_string()));
        }

        if self.retry_delay_factor < 1.0 {
            return Err(fail(format!(
                "retry_delay_factor must be at least 1, got {}",
                self.retry_delay_factor
            )));
        }

        if !self.retry_delay_max.is_zero() && self.retry_delay_max < self.retry_delay_initial {
            return Err(fail(
                "retry_delay_max must be zero or at least retry_delay_initial".to_string(),
            ));
        }

        if self.journal_retention < Duration::from_secs(60 * 60) {
            return Err(fail("journal_retention must be at least 1h".to_string()));
        }

        if self.journal_retention < self.timeout || self.journal_retention < self.retry_delay_max {
            return Err(fail(
                "journal_retention must cover timeout and retry_delay_max".to_string(),
            ));
        }

        for (field, dir) in [
            ("journal_dir", &self.journal_dir),
            ("success_dir", &self.success_dir),
            ("failure_dir", &self.failure_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(fail(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }

    /// Root-relative infrastructure directories contained within the root.
    ///
    /// Directories configured outside the root are intentionally absent; they
    /// are not part of the observed tree and are never used to filter events.
    pub fn infra_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        for dir in [&self.journal_dir, &self.success_dir, &self.failure_dir] {
            if let Ok(resolved) = relpath::resolve(&self.path, dir) {
                if resolved.contained() {
                    dirs.push(resolved.relative);
                }
            }
        }

        dirs.sort();
        dirs.dedup();
        dirs
    }
}

/// Top-level configuration: a list of handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "handler")]
    pub handlers: Vec<HandlerConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();

        for handler in &self.handlers {
            handler.validate()?;

            if !seen.insert(handler.name.as_str()) {
                return Err(ConfigError::DuplicateName(handler.name.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
