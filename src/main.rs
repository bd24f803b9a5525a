//! packstore - Runtime package cache composer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use packstore::cli::{Cli, Commands};
use packstore::error::PackstoreResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.stage() {
                Some(stage) => eprintln!(
                    "{} {} ({} stage)",
                    style("Error:").red().bold(),
                    e,
                    stage
                ),
                None => eprintln!("{} {}", style("Error:").red().bold(), e),
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PackstoreResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("packstore=warn"),
        1 => EnvFilter::new("packstore=info"),
        _ => EnvFilter::new("packstore=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Compose(args) => packstore::cli::commands::compose(args).await,
        Commands::Platforms(args) => packstore::cli::commands::platforms(args).await,
        Commands::Completions(args) => packstore::cli::commands::completions(args),
    }
}
