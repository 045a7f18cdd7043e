use crate::cli::{CommentArgs, CommentsArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::util::time::format_ms;

use super::open_store;

/// Add a comment to an issue.
///
/// # Errors
///
/// Returns an error on unresolved id or any store error.
pub fn add(args: &CommentArgs, overrides: &CliOverrides) -> Result<()> {
    let mut store = open_store(overrides)?;
    let id = store.resolve_id(&args.id)?;
    let comment = store.add_comment(&id, &args.body)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&comment)?);
    } else {
        println!("Commented on {id}");
    }
    Ok(())
}

/// List an issue's comments, oldest first.
///
/// # Errors
///
/// Returns an error on unresolved id or any store error.
pub fn list(args: &CommentsArgs, overrides: &CliOverrides) -> Result<()> {
    let store = open_store(overrides)?;
    let id = store.resolve_id(&args.id)?;
    let comments = store.get_comments(&id)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&comments)?);
    } else if comments.is_empty() {
        println!("No comments on {id}");
    } else {
        for comment in &comments {
            println!("{}  {}", format_ms(comment.created_at), comment.body);
        }
    }
    Ok(())
}
