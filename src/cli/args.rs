//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// packstore - Runtime package cache composer
///
/// Composes a minimal, deployable runtime cache for a target platform
/// from resolved dependency closures, and writes a manifest of the
/// package identities that contributed content.
#[derive(Parser, Debug)]
#[command(name = "packstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a runtime cache from resolved closures
    Compose(ComposeArgs),

    /// Show platform fallback chains
    Platforms(PlatformsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the compose command
#[derive(Parser, Debug)]
pub struct ComposeArgs {
    /// Resolved closure file (repeatable, at least one)
    #[arg(long = "closure", value_name = "FILE", required = true)]
    pub closures: Vec<PathBuf>,

    /// Target platform identifier (e.g. win7-x64)
    #[arg(short, long)]
    pub platform: String,

    /// Output directory for the composed cache
    #[arg(short, long)]
    pub output: PathBuf,

    /// Staging directory (defaults to a fresh directory under the user
    /// state dir)
    #[arg(long)]
    pub staging: Option<PathBuf>,

    /// Baseline asset set for the target platform
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Replacement platform fallback graph
    #[arg(long, env = "PACKSTORE_PLATFORM_GRAPH")]
    pub platform_graph: Option<PathBuf>,

    /// Keep assets the shared runtime already provides
    #[arg(long)]
    pub skip_baseline_removal: bool,

    /// Skip ahead-of-time optimization of managed assets
    #[arg(long)]
    pub skip_optimization: bool,

    /// Keep the staging directory after completion or failure
    #[arg(long)]
    pub retain_staging: bool,

    /// Use the output path verbatim instead of nesting under the
    /// platform id
    #[arg(long)]
    pub no_decorate: bool,

    /// Package id that must contribute at least one asset (repeatable)
    #[arg(long = "require", value_name = "PACKAGE_ID")]
    pub required: Vec<String>,

    /// External optimizer tool, invoked as: <tool> <source> <dest>
    #[arg(long, conflicts_with = "skip_optimization")]
    pub optimizer: Option<PathBuf>,

    /// Seconds allowed per optimizer invocation
    #[arg(long, value_name = "SECS")]
    pub optimizer_timeout: Option<u64>,

    /// Worker pool size (defaults to the number of CPUs)
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Arguments for the platforms command
#[derive(Parser, Debug)]
pub struct PlatformsArgs {
    /// Replacement platform fallback graph
    #[arg(long, env = "PACKSTORE_PLATFORM_GRAPH")]
    pub platform_graph: Option<PathBuf>,

    /// Show the chain for one platform only
    #[arg(short, long)]
    pub platform: Option<String>,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
