//! Command implementations. Each command opens the store (which
//! reconciles the cache with the log), runs one store operation, and
//! formats the result.

pub mod clean;
pub mod comment;
pub mod completions;
pub mod create;
pub mod dep;
pub mod init;
pub mod list;
pub mod migrate;
pub mod ready;
pub mod reimport;
pub mod show;
pub mod update;
pub mod version;

use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::store::Store;

pub(crate) fn open_store(overrides: &CliOverrides) -> Result<Store> {
    let dir = config::resolve_store_dir(overrides)?;
    Store::open(&dir)
}
