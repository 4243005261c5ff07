// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `move-into` subcommand
//!
//! Moves source files into a target directory without overwriting anything.
//! Name conflicts are resolved by deriving another available name from the
//! original. Handler commands invoke this through `$BAAMHACKL_PROGRAM` to
//! deliver results into observed directories.

use crate::CliError;
use baamhackl_core::uniquename::{Generator, Options};
use baamhackl_core::waryio;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct MoveIntoArgs {
    /// Preferred destination name. Only valid with a single source file.
    #[arg(long)]
    rename: Option<String>,

    /// Directory receiving the files.
    target_dir: PathBuf,

    /// Files to move.
    #[arg(required = true)]
    sources: Vec<PathBuf>,
}

pub fn handle(args: MoveIntoArgs) -> Result<(), CliError> {
    if args.rename.is_some() && args.sources.len() > 1 {
        return Err(CliError::Usage(
            "preferred destination names are only supported with a single source file".to_string(),
        ));
    }

    let naming = Options {
        time_prefix_enabled: false,
        ..Options::default()
    };

    for source in &args.sources {
        let name = match &args.rename {
            Some(rename) => PathBuf::from(rename),
            None => match source.file_name() {
                Some(name) => PathBuf::from(name),
                None => {
                    return Err(CliError::Usage(format!(
                        "source path has no file name: {}",
                        source.display()
                    )))
                }
            },
        };

        let mut names = Generator::new(&args.target_dir.join(name), &naming)
            .map_err(anyhow::Error::from)?;

        let dest = waryio::rename_to_available(source, &mut names)
            .map_err(anyhow::Error::from)?;

        tracing::info!(
            source = %source.display(),
            dest = %dest.display(),
            "moved file"
        );
    }

    Ok(())
}
