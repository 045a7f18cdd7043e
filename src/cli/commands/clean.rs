use crate::cli::CleanArgs;
use crate::config::CliOverrides;
use crate::error::Result;

use super::open_store;

/// Execute the clean command.
///
/// # Errors
///
/// Returns an error on any store error.
pub fn execute(args: &CleanArgs, overrides: &CliOverrides) -> Result<()> {
    let mut store = open_store(overrides)?;
    let report = store.clean(args.older_than, args.force)?;

    if overrides.json {
        let payload = serde_json::json!({
            "removed": report.removed,
            "dry_run": report.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if report.removed.is_empty() {
        println!("Nothing to clean.");
    } else if report.dry_run {
        println!("Would remove {} issue(s):", report.removed.len());
        for issue in &report.removed {
            println!("  {} [{}] {}", issue.id, issue.status, issue.title);
        }
        println!("Re-run with --force to rewrite the log.");
    } else {
        println!("Removed {} issue(s) from the log.", report.removed.len());
    }
    Ok(())
}
