use crate::config::CliOverrides;
use crate::error::Result;

use super::open_store;

/// Execute the reimport command: rebuild the cache from the log.
///
/// # Errors
///
/// Returns an error on any store error.
pub fn execute(overrides: &CliOverrides) -> Result<()> {
    let mut store = open_store(overrides)?;
    store.force_reimport()?;

    if overrides.json {
        println!("{}", serde_json::json!({ "reimported": true }));
    } else {
        println!("Rebuilt cache from log.");
    }
    Ok(())
}
