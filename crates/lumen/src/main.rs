//! Lumen CLI - incremental image asset pipeline for documentation sites.
//!
//! Lumen scans the project in the current directory for source images and
//! writes resized variants, public originals and blur placeholders, skipping
//! everything its cache already covers.
//!
//! # Usage
//!
//! ```bash
//! # Process every new or changed image
//! lumen
//!
//! # Delete all caches and generated images
//! lumen --clear-cache
//!
//! # Rewrite image references in an mdast JSON tree
//! lumen hydrate docs/page.json --output page.hydrated.json
//!
//! # View configuration
//! lumen config show
//! ```

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use lumen_core::Config;
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod logging;

/// Lumen - incremental image asset pipeline.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to lumen.toml in the current directory)
    #[arg(short, long, global = true, env = "LUMEN_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of images processed at once (default: all queued)
    #[arg(short, long, global = true)]
    parallel: Option<NonZeroUsize>,

    /// Delete every cache store and generated image, then exit
    #[arg(long)]
    clear_cache: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// Parse arguments, rejecting `--clear-cache` alongside a subcommand.
    fn try_parse_checked<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Self::try_parse_from(args)?;
        if cli.clear_cache && cli.command.is_some() {
            return Err(Self::command().error(
                ErrorKind::ArgumentConflict,
                "--clear-cache cannot be combined with a subcommand",
            ));
        }
        Ok(cli)
    }
}

/// Available commands. Without one, Lumen processes the project.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite image references in a document tree using the cache
    Hydrate(cli::hydrate::HydrateArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::try_parse_checked(std::env::args_os()).unwrap_or_else(|e| e.exit());
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = std::env::current_dir().context("Cannot determine the working directory")?;

    // Logging needs settings even when the config file is broken, so the
    // failure is reported through the defaults' sinks.
    let loaded = Config::load(&root, cli.config.as_deref());
    let settings = loaded.as_ref().cloned().unwrap_or_default();
    logging::init(
        &settings.logging,
        &settings.resolve(&root).error_log,
        cli.verbose,
        cli.json_logs,
    );
    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Some(Commands::Config(args)) => {
            cli::config::execute(args, &root, cli.config.as_deref(), loaded)
        }
        Some(Commands::Hydrate(args)) => {
            let config = loaded.context("Failed to load configuration")?;
            cli::hydrate::execute(args, &config, &config.resolve(&root))
        }
        None => {
            let config = loaded.context("Failed to load configuration")?;
            let paths = config.resolve(&root);
            if cli.clear_cache {
                return cli::run::clear_cache(&paths).await;
            }
            let options = cli::run::RunOptions {
                parallel: cli.parallel.map(NonZeroUsize::get),
                show_progress: !cli.json_logs,
            };
            cli::run::execute(&config, &paths, options).await
        }
    }
}
