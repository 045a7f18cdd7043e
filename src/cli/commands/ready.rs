use crate::cli::ReadyArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::output;

use super::open_store;

/// Execute the ready command.
///
/// # Errors
///
/// Returns an error on any store error.
pub fn execute(args: &ReadyArgs, overrides: &CliOverrides) -> Result<()> {
    let store = open_store(overrides)?;
    let issues = store.list_ready(args.limit)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print!("{}", output::issue_table(&issues));
    }
    Ok(())
}
