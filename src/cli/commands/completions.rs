//! Completions command - generate shell completion scripts

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::PackstoreResult;
use clap::CommandFactory;

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> PackstoreResult<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "packstore", &mut std::io::stdout());
    Ok(())
}
