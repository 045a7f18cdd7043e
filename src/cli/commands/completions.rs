use clap::CommandFactory;

use crate::cli::{Cli, CompletionsArgs};
use crate::error::Result;

/// Generate shell completions on stdout.
///
/// # Errors
///
/// Infallible in practice; the signature matches the dispatch table.
pub fn execute(args: &CompletionsArgs) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "tissue", &mut std::io::stdout());
    Ok(())
}
