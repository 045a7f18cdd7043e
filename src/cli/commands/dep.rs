use crate::cli::{DepCommands, DepsArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::DepKind;

use super::open_store;

/// Execute a dep subcommand.
///
/// `dep add <id> <kind> <target>` declares that `<id>` depends on
/// `<target>`: for `blocks` the target is the blocker, for `parent`
/// the target is the parent. The stored edge therefore runs from the
/// target to the id; `relates` is symmetric and canonicalized by the
/// store.
///
/// # Errors
///
/// Returns an error on unresolved ids, invalid kind, self-reference,
/// or any store error.
pub fn execute(command: &DepCommands, overrides: &CliOverrides) -> Result<()> {
    let (id, kind, target, remove) = match command {
        DepCommands::Add { id, kind, target } => (id, kind, target, false),
        DepCommands::Rm { id, kind, target } => (id, kind, target, true),
    };

    let mut store = open_store(overrides)?;
    let id = store.resolve_id(id)?;
    let target = store.resolve_id(target)?;
    let kind: DepKind = kind.parse()?;

    let (src, dst) = if kind.is_symmetric() {
        (id.as_str(), target.as_str())
    } else {
        (target.as_str(), id.as_str())
    };

    let dep = if remove {
        store.remove_dep(src, dst, &kind)?
    } else {
        store.add_dep(src, dst, &kind)?
    };

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&dep)?);
    } else if remove {
        println!("Removed dependency: {} {} {}", dep.src_id, dep.kind, dep.dst_id);
    } else {
        println!("Added dependency: {} {} {}", dep.src_id, dep.kind, dep.dst_id);
    }
    Ok(())
}

/// List an issue's active dependencies from either side.
///
/// # Errors
///
/// Returns an error on unresolved id or any store error.
pub fn list(args: &DepsArgs, overrides: &CliOverrides) -> Result<()> {
    let store = open_store(overrides)?;
    let id = store.resolve_id(&args.id)?;
    let deps = store.get_deps(&id)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&deps)?);
    } else if deps.is_empty() {
        println!("No dependencies on {id}");
    } else {
        for dep in &deps {
            println!("{} {} {}", dep.src_id, dep.kind, dep.dst_id);
        }
    }
    Ok(())
}
