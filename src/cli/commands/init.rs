use crate::cli::InitArgs;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::store::Store;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the store cannot be created or the prefix is
/// invalid.
pub fn execute(args: &InitArgs, overrides: &CliOverrides) -> Result<()> {
    let dir = config::init_store_dir(overrides)?;
    let store = Store::init(&dir, args.prefix.as_deref())?;

    if overrides.json {
        let payload = serde_json::json!({
            "store": store.dir(),
            "prefix": store.prefix(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Initialized issue store in {} (prefix: {})",
            store.dir().display(),
            store.prefix()
        );
    }
    Ok(())
}
