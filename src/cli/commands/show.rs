use crate::cli::ShowArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::output;

use super::open_store;

/// Execute the show command.
///
/// # Errors
///
/// Returns an error on unresolved id or any store error.
pub fn execute(args: &ShowArgs, overrides: &CliOverrides) -> Result<()> {
    let store = open_store(overrides)?;
    let id = store.resolve_id(&args.id)?;
    let issue = store.get_issue(&id)?;
    let comments = store.get_comments(&id)?;
    let deps = store.get_deps(&id)?;

    if overrides.json {
        let payload = serde_json::json!({
            "issue": issue,
            "comments": comments,
            "deps": deps,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", output::issue_detail(&issue, &comments, &deps));
    }
    Ok(())
}
