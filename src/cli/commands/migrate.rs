use std::path::PathBuf;

use crate::cli::MigrateArgs;
use crate::config::{CliOverrides, STORE_DIR_NAME};
use crate::error::Result;

use super::open_store;

/// Execute the migrate command.
///
/// Accepts either a store directory or a project directory containing
/// one.
///
/// # Errors
///
/// Returns an error if the source log is missing or on any store
/// error.
pub fn execute(args: &MigrateArgs, overrides: &CliOverrides) -> Result<()> {
    let src = resolve_src(&args.src);

    let mut store = open_store(overrides)?;
    let report = store.migrate(&src, args.force)?;

    if overrides.json {
        let payload = serde_json::json!({
            "issues": report.issues,
            "deps": report.deps,
            "comments": report.comments,
            "dry_run": report.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let verb = if report.dry_run { "Would migrate" } else { "Migrated" };
    println!(
        "{verb} {} issue(s), {} dep(s), {} comment(s) from {}",
        report.issues,
        report.deps,
        report.comments,
        src.display()
    );
    Ok(())
}

fn resolve_src(src: &PathBuf) -> PathBuf {
    let nested = src.join(STORE_DIR_NAME);
    if !src.join("issues.jsonl").exists() && nested.join("issues.jsonl").exists() {
        nested
    } else {
        src.clone()
    }
}
