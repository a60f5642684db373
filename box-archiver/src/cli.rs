///
/// This module implements the CLI interface for box-archiver: command parsing,
/// argument validation and the async [`run`] entrypoint.
///
/// All pipeline logic lives in the [`box-archiver-core`] crate. This module
/// only resolves arguments and config, builds the Box client and hands both to
/// the core.
///
/// ## Subcommands
/// - `archive`: package a month of `{YYYY-MM}-*` files into `{YYYY-MM}.zip` and sync it
/// - `sync`: create or update one named file in the configured folder
///
/// [`box-archiver-core`]: ../../box-archiver-core/
use crate::load_config::load_config;
use crate::upload::BoxClient;
use anyhow::Result;
use box_archiver_core::catalog::FolderCatalog;
use box_archiver_core::period::ArchiveJob;
use box_archiver_core::synchronise::{synchronise_file, synchronise_period, SynchroniseReport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for box-archiver: archive monthly files and keep them in a Box folder.
#[derive(Parser)]
#[clap(
    name = "box-archiver",
    version,
    about = "Archive a month of files into a zip and upload or update it in Box"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Archive `{month}-*` files into `{month}.zip` and sync the archive
    Archive {
        /// Target month as YYYY-MM; defaults to the previous calendar month
        #[clap(short = 'm', long)]
        month: Option<String>,
        /// Path to the YAML config file
        #[clap(short = 'c', long)]
        config: PathBuf,
        /// Directory holding the files to archive; defaults to the current directory
        #[clap(short = 'd', long)]
        dir: Option<PathBuf>,
    },
    /// Upload a file, or update its contents if the folder already has it
    Sync {
        /// File to upload
        #[clap(short = 'f', long)]
        file: PathBuf,
        /// Path to the YAML config file
        #[clap(short = 'c', long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let result = match cli.command {
        Commands::Archive { month, config, dir } => {
            let working_directory = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            // Validate the month before touching config or network.
            let job = match month {
                Some(month) => ArchiveJob::for_period(&month, working_directory)?,
                None => ArchiveJob::for_previous_month(working_directory),
            };
            println!("target_month is {}", job.period_prefix());

            let config = load_config(config)?;
            let client = BoxClient::connect(&config.remote).await?;
            let catalog = FolderCatalog::new(&client);
            tracing::info!(command = "archive", "Starting synchronisation process");
            report(synchronise_period(&job, &config.sync, &catalog, &client).await)
        }
        Commands::Sync { file, config } => {
            if !file.is_file() {
                tracing::error!(file = %file.display(), "No such file found");
                anyhow::bail!("No such file found: {}", file.display());
            }
            println!("target file is {}", file.display());

            let config = load_config(config)?;
            let client = BoxClient::connect(&config.remote).await?;
            let catalog = FolderCatalog::new(&client);
            tracing::info!(command = "sync", "Starting synchronisation process");
            report(synchronise_file(&file, &config.sync, &catalog, &client).await)
        }
    };

    // Emit an 'exit' span for structured tracing.
    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| {
        tracing::info!(ok = result.is_ok(), "run finished");
    });

    result
}

fn report(outcome: box_archiver_core::Result<SynchroniseReport>) -> Result<()> {
    match outcome {
        Ok(report) => {
            tracing::info!(?report, "Synchronisation complete");
            println!("Synchronise complete.\nReport:");
            println!("{:#?}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Synchronisation failed");
            eprintln!("[ERROR] Synchronisation failed: {}", e);
            Err(e.into())
        }
    }
}
