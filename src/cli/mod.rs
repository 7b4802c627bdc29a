//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod dev;
mod prod;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::build::BuildContext;
use crate::config::{load_config, ConfigError};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Frontpipe - frontend asset pipeline
#[derive(Parser, Debug)]
#[command(name = "frontpipe")]
#[command(about = "Frontpipe - compile, serve and live-reload a static site, or package it for deployment")]
#[command(version)]
pub struct Cli {
    /// Path to frontpipe.toml (default: search upwards from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Compile styles, serve the source tree and live-reload on changes (default)
    Dev,

    /// Clean, rebuild minified assets under cache-busting names and zip them
    Prod {
        /// List the build plan without executing it
        #[arg(long)]
        dry_run: bool,

        /// Stop after the first failing wave
        #[arg(long)]
        fail_fast: bool,
    },
}

/// Load the configuration and build a context, printing config errors.
pub(crate) fn load_context(config: Option<&Path>) -> Result<BuildContext, ExitCode> {
    match load_config(config) {
        Ok(loaded) => {
            match &loaded.source {
                Some(path) => tracing::debug!("Using config: {}", path.display()),
                None => tracing::debug!("No frontpipe.toml found, using defaults"),
            }
            Ok(BuildContext::new(loaded.config, loaded.project_root))
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Error: invalid configuration");
            for error in errors {
                eprintln!("  {}", error);
            }
            Err(ExitCode::from(EXIT_INVALID_ARGS))
        }
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            Err(ExitCode::from(EXIT_INVALID_ARGS))
        }
    }
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init_cli_logger(cli.verbose);

    let context = match load_context(cli.config.as_deref()) {
        Ok(context) => context,
        Err(code) => return code,
    };

    match cli.command.unwrap_or(Commands::Dev) {
        Commands::Dev => dev::run_dev(context),
        Commands::Prod { dry_run, fail_fast } => prod::run_prod(context, dry_run, fail_fast),
    }
}
