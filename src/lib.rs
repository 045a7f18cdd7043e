//! tissue: a local, git-native issue tracker.
//!
//! The durable source of truth is an append-only JSONL log
//! (`issues.jsonl`), versioned by the user's VCS; a relational cache
//! (`issues.db`) with full-text search is mechanically derived from
//! it. The store sustains concurrent writers across processes,
//! survives arbitrary external mutations of the log (pulls, merges,
//! hand edits), and reconciles them with last-writer-wins semantics
//! keyed on sortable revision tokens.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod store;
pub mod util;

pub use error::{Result, TissueError};
pub use model::{Comment, Dep, DepKind, DepState, Issue, Priority, Record, Status};
pub use store::{CleanReport, IssuePatch, ListFilter, MigrateReport, NewIssue, Store};
