//! Store-directory resolution.
//!
//! Priority order: explicit `--store` override, then an existing
//! `.tissue` found by walking upward from the working directory, then
//! the `TISSUE_DIR` environment variable (absolute or relative to the
//! working directory).

use std::path::{Path, PathBuf};

use crate::error::{Result, TissueError};

pub const STORE_DIR_NAME: &str = ".tissue";
pub const STORE_ENV_VAR: &str = "TISSUE_DIR";

/// Global CLI flags every command receives.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub store: Option<PathBuf>,
    pub json: bool,
}

/// Resolve the store directory for commands that need an existing
/// store.
///
/// # Errors
///
/// `StoreNotFound` naming `./.tissue` when nothing resolves.
pub fn resolve_store_dir(overrides: &CliOverrides) -> Result<PathBuf> {
    if let Some(ref dir) = overrides.store {
        return Ok(dir.clone());
    }

    let cwd = std::env::current_dir()?;
    if let Some(found) = find_upward(&cwd) {
        return Ok(found);
    }

    if let Ok(env_dir) = std::env::var(STORE_ENV_VAR) {
        if !env_dir.is_empty() {
            let path = PathBuf::from(&env_dir);
            return Ok(if path.is_absolute() { path } else { cwd.join(path) });
        }
    }

    Err(TissueError::StoreNotFound {
        path: cwd.join(STORE_DIR_NAME),
    })
}

/// The directory `init` targets when no override is given.
///
/// # Errors
///
/// Returns an error if the working directory is unreadable.
pub fn init_store_dir(overrides: &CliOverrides) -> Result<PathBuf> {
    if let Some(ref dir) = overrides.store {
        return Ok(dir.clone());
    }
    Ok(std::env::current_dir()?.join(STORE_DIR_NAME))
}

/// Walk from `start` to the filesystem root looking for a `.tissue`
/// directory.
#[must_use]
pub fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(STORE_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
