// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `watch` subcommand
//!
//! Loads the handler configuration, starts the shared scheduler and ingests
//! change-event batches as JSON lines on standard input. The process drains
//! gracefully on SIGINT/SIGTERM or when the input stream ends.

use crate::CliError;
use anyhow::Context;
use baamhackl_core::clock::SystemClock;
use baamhackl_core::Config;
use baamhackl_engine::{event, Router};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

const STOP_GRACE_PERIOD: Duration = Duration::from_secs(15);

#[derive(Args)]
pub struct WatchArgs {
    /// Handler configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Number of handler commands running concurrently. Defaults to the
    /// number of CPUs.
    #[arg(long)]
    slots: Option<usize>,

    /// How often to prune journal and archive directories.
    #[arg(long, default_value = "1h", value_parser = humantime::parse_duration)]
    prune_interval: Duration,
}

pub async fn handle(args: WatchArgs) -> Result<(), CliError> {
    let config = Config::load(&args.config)
        .map_err(|e| CliError::Usage(format!("invalid configuration: {e}")))?;

    if config.handlers.is_empty() {
        return Err(CliError::Usage("no handlers configured".to_string()));
    }

    let slots = args.slots.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1)
    });

    let router = Router::new(config.handlers, SystemClock);
    router.start(slots);
    router.start_pruning(args.prune_interval);

    tracing::info!(slots, "watching for change events on stdin");

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT");
                break;
            }
            line = lines.next_line() => {
                match line.context("reading change events")? {
                    None => {
                        tracing::info!("input stream ended; draining pending tasks");
                        drain_pending(&router).await;
                        break;
                    }
                    Some(line) => ingest_line(&router, &line).await,
                }
            }
        }
    }

    let deadline = CancellationToken::new();
    let timer = deadline.clone();
    tokio::spawn(async move {
        tokio::time::sleep(STOP_GRACE_PERIOD).await;
        timer.cancel();
    });

    if router.stop(&deadline).await.is_err() {
        tracing::warn!("shutdown grace period expired; tasks were cancelled");
    }

    Ok(())
}

/// Wait until no change tasks are pending, bounded by the grace period.
/// Periodic prune tasks keep the scheduler queue non-empty, so waiting on
/// pending file names is the drain criterion.
async fn drain_pending(router: &Router<SystemClock>) {
    let deadline = tokio::time::Instant::now() + STOP_GRACE_PERIOD;

    while router.pending_total().await > 0 {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("drain grace period expired with tasks still pending");
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn ingest_line(router: &Router<SystemClock>, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let events = match event::parse_batch(line) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, "discarding unparseable change event batch");
            return;
        }
    };

    for event in events {
        if let Err(e) = router.file_changed(&event).await {
            tracing::error!(
                handler = %event.handler_name,
                name = %event.change.name.display(),
                error = %e,
                "rejected change event"
            );
        }
    }
}
