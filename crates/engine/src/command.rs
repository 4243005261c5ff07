// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External handler command invocation
//!
//! One invocation prepares the per-attempt workspace (a verified copy of the
//! input file and an empty working directory), then runs the configured
//! command with merged stdout/stderr captured into the attempt directory.
//! The child is killed when the attempt deadline passes or the supervisor
//! shuts down.

use crate::teelog::TeeWriter;
use baamhackl_core::waryio::{self, CopyOptions, WaryError};
use nix::sys::resource::{getrusage, Usage, UsageWho};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing command")]
    MissingCommand,

    #[error("source path has no file name: {}", .0.display())]
    InvalidSource(PathBuf),

    #[error("cannot determine own executable: {0}")]
    NoExecutable(std::io::Error),

    #[error("creating directories failed: {0}")]
    Workspace(#[source] WaryError),

    #[error("copying changed file failed: {0}")]
    CopyInput(#[source] WaryError),

    #[error("opening output file failed: {0}")]
    OutputFile(#[source] std::io::Error),

    #[error("starting command failed: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("waiting for command failed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("command failed with exit code {code}")]
    Failed { code: i32 },

    #[error("command terminated by signal")]
    Killed,

    /// The command was interrupted because the attempt context was
    /// cancelled; the underlying failure is preserved as the source.
    #[error("command cancelled: {source}")]
    Cancelled {
        #[source]
        source: Box<CommandError>,
    },

    /// The command exceeded the attempt deadline.
    #[error("command timed out: {source}")]
    TimedOut {
        #[source]
        source: Box<CommandError>,
    },
}

impl CommandError {
    /// Whether the error reflects cancellation rather than command failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::TimedOut { .. })
    }
}

/// Environment variable names exposed to handler commands.
pub const ENV_PROGRAM: &str = "BAAMHACKL_PROGRAM";
pub const ENV_ORIGINAL: &str = "BAAMHACKL_ORIGINAL";
pub const ENV_WORKDIR: &str = "BAAMHACKL_WORKDIR";
pub const ENV_INPUT: &str = "BAAMHACKL_INPUT";

pub struct CommandOptions {
    /// Path to the changed file.
    pub source_file: PathBuf,

    /// Directory for storing execution-related files.
    pub base_dir: PathBuf,

    /// Command arguments.
    pub argv: Vec<String>,
}

/// A prepared handler command for one changed file.
#[derive(Debug)]
pub struct HandlerCommand {
    source_file: PathBuf,
    input_dir: PathBuf,
    input_file: PathBuf,
    work_dir: PathBuf,
    output_file: PathBuf,
    argv: Vec<String>,
    env: Vec<(&'static str, PathBuf)>,
}

impl HandlerCommand {
    pub fn new(opts: CommandOptions) -> Result<Self, CommandError> {
        let program = std::env::current_exe().map_err(CommandError::NoExecutable)?;

        if opts.argv.is_empty() {
            return Err(CommandError::MissingCommand);
        }

        let input_dir = opts.base_dir.join("input");
        let work_dir = opts.base_dir.join("work");
        let output_file = opts.base_dir.join("command_output.txt");

        let input_file = match opts.source_file.file_name() {
            Some(name) => input_dir.join(name),
            None => return Err(CommandError::InvalidSource(opts.source_file)),
        };

        let env = vec![
            (ENV_PROGRAM, program),
            (ENV_ORIGINAL, opts.source_file.clone()),
            (ENV_WORKDIR, work_dir.clone()),
            (ENV_INPUT, input_file.clone()),
        ];

        Ok(Self {
            source_file: opts.source_file,
            input_dir,
            input_file,
            work_dir,
            output_file,
            argv: opts.argv,
            env,
        })
    }

    pub fn input_file(&self) -> &Path {
        &self.input_file
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn prepare(&self) -> Result<(), CommandError> {
        for dir in [&self.input_dir, &self.work_dir] {
            match std::fs::create_dir(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(CommandError::Workspace(WaryError::Io {
                        op: "mkdir",
                        path: dir.clone(),
                        source: e,
                    }))
                }
            }
        }

        waryio::copy_vigilant(&self.source_file, &self.input_file, &CopyOptions::default())
            .map_err(CommandError::CopyInput)?;

        Ok(())
    }

    /// Run the command. `timeout` bounds the execution; the token reflects
    /// supervisor shutdown. Killed-by-cancellation errors wrap the
    /// underlying failure so callers can tell the two apart.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
        log: &mut TeeWriter,
    ) -> Result<(), CommandError> {
        self.prepare()?;

        let output = std::fs::OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&self.output_file)
            .map_err(CommandError::OutputFile)?;

        let stderr = output.try_clone().map_err(CommandError::OutputFile)?;

        let mut command = tokio::process::Command::new(&self.argv[0]);
        command
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            .current_dir(&self.work_dir)
            .kill_on_drop(true);

        for (key, value) in &self.env {
            command.env(key, value);
        }

        log.info(
            "run handler command",
            json!({
                "args": self.argv,
                "dir": self.work_dir.display().to_string(),
                "timeout_secs": timeout.as_secs_f64(),
            }),
        );

        let start = Instant::now();
        let usage_before = getrusage(UsageWho::RUSAGE_CHILDREN).ok();

        let mut child = command.spawn().map_err(CommandError::Spawn)?;

        enum Interrupt {
            None,
            Cancelled,
            TimedOut,
        }

        let (status, interrupt) = tokio::select! {
            status = child.wait() => (status, Interrupt::None),
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                (child.wait().await, Interrupt::Cancelled)
            }
            _ = tokio::time::sleep(timeout) => {
                let _ = child.start_kill();
                (child.wait().await, Interrupt::TimedOut)
            }
        };

        let wall_time = start.elapsed();

        let result = match status {
            Err(e) => Err(CommandError::Wait(e)),
            Ok(status) if status.success() => Ok(()),
            Ok(status) => match status.code() {
                Some(code) => Err(CommandError::Failed { code }),
                None => Err(CommandError::Killed),
            },
        };

        let mut fields = json!({
            "wall_time_secs": wall_time.as_secs_f64(),
            "exit_code": status_code(&result),
        });

        if let (Some(before), Ok(after)) = (usage_before, getrusage(UsageWho::RUSAGE_CHILDREN)) {
            let (user, system) = usage_delta(&before, &after);
            fields["user_time_secs"] = json!(user);
            fields["system_time_secs"] = json!(system);
        }

        match &result {
            Ok(()) => log.info("command exited", fields),
            Err(e) => {
                fields["error"] = json!(e.to_string());
                log.error("command exited", fields);
            }
        }

        result.map_err(|source| match interrupt {
            Interrupt::None => source,
            Interrupt::Cancelled => CommandError::Cancelled {
                source: Box::new(source),
            },
            Interrupt::TimedOut => CommandError::TimedOut {
                source: Box::new(source),
            },
        })
    }
}

fn status_code(result: &Result<(), CommandError>) -> Option<i32> {
    match result {
        Ok(()) => Some(0),
        Err(CommandError::Failed { code }) => Some(*code),
        Err(_) => None,
    }
}

fn usage_delta(before: &Usage, after: &Usage) -> (f64, f64) {
    let seconds = |tv: nix::sys::time::TimeVal| tv.tv_sec() as f64 + tv.tv_usec() as f64 / 1e6;

    (
        (seconds(after.user_time()) - seconds(before.user_time())).max(0.0),
        (seconds(after.system_time()) - seconds(before.system_time())).max(0.0),
    )
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
