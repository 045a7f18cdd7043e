use crate::config::CliOverrides;
use crate::error::Result;

/// Print the version.
///
/// # Errors
///
/// Infallible in practice; the signature matches the dispatch table.
pub fn execute(overrides: &CliOverrides) -> Result<()> {
    if overrides.json {
        println!(
            "{}",
            serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })
        );
    } else {
        println!("tissue {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
