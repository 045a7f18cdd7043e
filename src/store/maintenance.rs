//! Clean and migrate: the two operations that rewrite or splice logs.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Result, TissueError};
use crate::model::{Issue, Record};
use crate::store::import::full_reimport;
use crate::store::log::{append_records, LOG_FILE};
use crate::store::query::list_terminal;
use crate::store::with_immediate_txn;
use crate::util::time::{days_ago_ms, now_ms};

/// Outcome of `clean`.
#[derive(Debug, Clone)]
pub struct CleanReport {
    /// Issues that were (or would be) removed.
    pub removed: Vec<Issue>,
    pub dry_run: bool,
}

/// Outcome of `migrate`.
#[derive(Debug, Clone, Copy)]
pub struct MigrateReport {
    pub issues: usize,
    pub deps: usize,
    pub comments: usize,
    pub dry_run: bool,
}

/// Remove terminal-status issues from the log.
///
/// Without `force`, returns the would-be removals and changes
/// nothing. With `force`, rewrites the log to a temp sibling omitting
/// every record that references a removed issue, renames it over the
/// original, and runs a full reimport. Surviving lines keep their
/// relative order; lines that do not parse survive untouched.
///
/// # Errors
///
/// Returns an error on I/O or cache failure.
pub fn clean(
    conn: &mut Connection,
    log_path: &Path,
    lock: &File,
    older_than_days: Option<i64>,
    force: bool,
) -> Result<CleanReport> {
    let cutoff = older_than_days.map(|days| days_ago_ms(now_ms(), days));
    let removed = list_terminal(conn, cutoff)?;

    if !force || removed.is_empty() {
        return Ok(CleanReport {
            removed,
            dry_run: !force,
        });
    }

    let ids: HashSet<&str> = removed.iter().map(|i| i.id.as_str()).collect();

    fs2::FileExt::lock_exclusive(lock)?;
    let rewrite = rewrite_log(log_path, &ids);
    let _ = fs2::FileExt::unlock(lock);
    rewrite?;

    info!(removed = removed.len(), "rewrote log, rebuilding cache");
    full_reimport(conn, log_path, lock)?;

    Ok(CleanReport {
        removed,
        dry_run: false,
    })
}

fn rewrite_log(log_path: &Path, ids: &HashSet<&str>) -> Result<()> {
    let content = std::fs::read_to_string(log_path)?;
    let tmp_path = log_path.with_extension("jsonl.tmp");

    let mut tmp = File::create(&tmp_path)?;
    for line in content.lines() {
        if retain_line(line, ids) {
            tmp.write_all(line.as_bytes())?;
            tmp.write_all(b"\n")?;
        }
    }
    tmp.sync_all()?;
    drop(tmp);

    std::fs::rename(&tmp_path, log_path)?;
    Ok(())
}

fn retain_line(line: &str, ids: &HashSet<&str>) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    match serde_json::from_str::<Record>(line) {
        Ok(Record::Issue(rec)) => !ids.contains(rec.id.as_str()),
        Ok(Record::Comment(rec)) => !ids.contains(rec.issue_id.as_str()),
        Ok(Record::Dep(rec)) => {
            !ids.contains(rec.src_id.as_str()) && !ids.contains(rec.dst_id.as_str())
        }
        // Lines this version cannot parse are not ours to drop.
        Err(_) => true,
    }
}

/// Splice another store's log into this one.
///
/// Reads the source log in order and collects records absent from the
/// destination: issues by id (first occurrence wins within the
/// source), comments by id, deps by composite key with both endpoints
/// required to exist or be migrating. Appends the batch as
/// issues, then deps, then comments, and forces a reimport.
///
/// # Errors
///
/// `StoreNotFound` if the source log is missing, otherwise I/O or
/// cache errors.
pub fn migrate(
    conn: &mut Connection,
    log_path: &Path,
    lock: &File,
    src_dir: &Path,
    force: bool,
) -> Result<MigrateReport> {
    let src_log = src_dir.join(LOG_FILE);
    if !src_log.exists() {
        return Err(TissueError::StoreNotFound {
            path: src_dir.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(&src_log)?;

    let mut seen_issues: HashSet<String> = HashSet::new();
    let mut seen_comments: HashSet<String> = HashSet::new();
    let mut seen_deps: HashSet<(String, String, String)> = HashSet::new();
    let mut issues = Vec::new();
    let mut comments = Vec::new();
    let mut deps = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = match serde_json::from_str::<Record>(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping unreadable source record");
                continue;
            }
        };
        match record {
            Record::Issue(rec) => {
                if seen_issues.contains(&rec.id) || row_exists(conn, "issues", "id", &rec.id)? {
                    continue;
                }
                seen_issues.insert(rec.id.clone());
                issues.push(Record::Issue(rec));
            }
            Record::Comment(rec) => {
                if seen_comments.contains(&rec.id) || row_exists(conn, "comments", "id", &rec.id)? {
                    continue;
                }
                seen_comments.insert(rec.id.clone());
                comments.push(Record::Comment(rec));
            }
            Record::Dep(rec) => {
                let key = (
                    rec.src_id.clone(),
                    rec.dst_id.clone(),
                    rec.kind.as_str().to_string(),
                );
                if seen_deps.contains(&key) || dep_exists(conn, &rec.src_id, &rec.dst_id, rec.kind.as_str())? {
                    continue;
                }
                let src_ok = seen_issues.contains(&rec.src_id)
                    || row_exists(conn, "issues", "id", &rec.src_id)?;
                let dst_ok = seen_issues.contains(&rec.dst_id)
                    || row_exists(conn, "issues", "id", &rec.dst_id)?;
                if !src_ok || !dst_ok {
                    warn!(src = %rec.src_id, dst = %rec.dst_id, "skipping dep with missing endpoint");
                    continue;
                }
                seen_deps.insert(key);
                deps.push(Record::Dep(rec));
            }
        }
    }

    let report = MigrateReport {
        issues: issues.len(),
        deps: deps.len(),
        comments: comments.len(),
        dry_run: !force,
    };
    if !force {
        return Ok(report);
    }

    let mut batch = issues;
    batch.extend(deps);
    batch.extend(comments);
    if !batch.is_empty() {
        with_immediate_txn(conn, |tx| append_records(tx, log_path, lock, &batch))?;
    }
    full_reimport(conn, log_path, lock)?;

    info!(
        issues = report.issues,
        deps = report.deps,
        comments = report.comments,
        "migration complete"
    );
    Ok(report)
}

fn row_exists(conn: &Connection, table: &str, column: &str, value: &str) -> Result<bool> {
    use rusqlite::OptionalExtension;
    let sql = format!("SELECT 1 FROM {table} WHERE {column} = ?1");
    Ok(conn
        .query_row(&sql, [value], |_| Ok(()))
        .optional()?
        .is_some())
}

fn dep_exists(conn: &Connection, src: &str, dst: &str, kind: &str) -> Result<bool> {
    use rusqlite::OptionalExtension;
    Ok(conn
        .query_row(
            "SELECT 1 FROM deps WHERE src_id = ?1 AND dst_id = ?2 AND kind = ?3",
            rusqlite::params![src, dst, kind],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}
