// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! baamhackl - supervisor for filesystem-event-driven handler commands

mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

const EXIT_USAGE: u8 = 64;
const EXIT_UNAVAILABLE: u8 = 69;

/// Command failure split by exit code semantics.
pub enum CliError {
    /// Invalid invocation; maps to exit code 64.
    Usage(String),

    /// Runtime failure; maps to exit code 69.
    Runtime(anyhow::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(err)
    }
}

#[derive(Parser)]
#[command(name = "baamhackl")]
#[command(about = "Supervisor running commands against changed files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter directives (tracing syntax).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Observe handler roots and run commands for changed files
    Watch(commands::watch::WatchArgs),

    /// Move file(s) to a directory without overwriting
    MoveInto(commands::move_into::MoveIntoArgs),
}

#[tokio::main]
async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Watch(args) => commands::watch::handle(args).await,
        Commands::MoveInto(args) => commands::move_into::handle(args),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(EXIT_USAGE)
        }
        Err(CliError::Runtime(error)) => {
            tracing::error!(error = format!("{error:#}"), "command failed");
            ExitCode::from(EXIT_UNAVAILABLE)
        }
    }
}
