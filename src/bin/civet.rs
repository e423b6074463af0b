// src/bin/civet.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use civet::cli::{Cli, Commands};
use civet::commands::check::{check_paths, CheckOptions};
use civet::commands::checks::list_checks;
use civet::commands::index::index_paths;

fn main() -> ExitCode {
    // Initialize tracing if CIVET_LOG is set.
    if let Ok(filter) = EnvFilter::try_from_env("CIVET_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            paths,
            stubs,
            cache,
            rules,
            workers,
            include_disabled,
        } => check_paths(
            &paths,
            CheckOptions {
                stubs,
                cache,
                rules,
                workers,
                include_disabled,
                color: cli.color,
            },
        ),
        Commands::Index {
            paths,
            cache,
            workers,
        } => index_paths(&paths, &cache, workers),
        Commands::Checks => list_checks(),
    }
}
