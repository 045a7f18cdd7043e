use crate::cli::{ListArgs, SearchArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::output;
use crate::store::ListFilter;

use super::open_store;

/// Execute the list command.
///
/// # Errors
///
/// Returns an error on any store error.
pub fn execute(args: &ListArgs, overrides: &CliOverrides) -> Result<()> {
    let filter = ListFilter {
        status: args.status.clone(),
        tag: args.tag.clone(),
        search: args.search.clone(),
        limit: args.limit,
    };
    render(&filter, overrides)
}

/// Execute the search command (list with only a full-text query).
///
/// # Errors
///
/// Returns an error on any store error.
pub fn execute_search(args: &SearchArgs, overrides: &CliOverrides) -> Result<()> {
    let filter = ListFilter {
        search: Some(args.query.clone()),
        limit: args.limit,
        ..Default::default()
    };
    render(&filter, overrides)
}

fn render(filter: &ListFilter, overrides: &CliOverrides) -> Result<()> {
    let store = open_store(overrides)?;
    let issues = store.list_issues(filter)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print!("{}", output::issue_table(&issues));
    }
    Ok(())
}
