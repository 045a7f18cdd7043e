use crate::cli::CreateArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::Priority;
use crate::store::NewIssue;

use super::open_store;

/// Execute the create command.
///
/// # Errors
///
/// Returns an error on validation failure or any store error.
pub fn execute(args: &CreateArgs, overrides: &CliOverrides) -> Result<()> {
    let mut store = open_store(overrides)?;

    let priority = match args.priority.as_deref() {
        Some(p) => p.parse::<Priority>()?,
        None => Priority::default(),
    };

    let issue = store.create_issue(&NewIssue {
        title: args.title.clone(),
        body: args.body.clone(),
        priority,
        tags: args.tags.clone(),
    })?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        println!("Created {}: {}", issue.id, issue.title);
    }
    Ok(())
}
