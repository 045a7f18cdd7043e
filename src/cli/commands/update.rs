use crate::cli::{StatusArgs, UpdateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::{Priority, Status};
use crate::store::IssuePatch;

use super::open_store;

/// Execute the update command.
///
/// # Errors
///
/// Returns an error on validation failure, unresolved id, or any
/// store error.
pub fn execute(args: &UpdateArgs, overrides: &CliOverrides) -> Result<()> {
    let patch = IssuePatch {
        title: args.title.clone(),
        body: args.body.clone(),
        status: args
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?,
        priority: args
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?,
        add_tags: args.add_tags.clone(),
        remove_tags: args.remove_tags.clone(),
    };

    let mut store = open_store(overrides)?;
    let id = store.resolve_id(&args.id)?;
    let issue = store.update_issue(&id, &patch)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        println!("Updated {}: {}", issue.id, issue.title);
    }
    Ok(())
}

/// Execute the status shorthand.
///
/// # Errors
///
/// Same conditions as [`execute`].
pub fn execute_status(args: &StatusArgs, overrides: &CliOverrides) -> Result<()> {
    let update = UpdateArgs {
        id: args.id.clone(),
        status: Some(args.status.clone()),
        ..Default::default()
    };
    execute(&update, overrides)
}
