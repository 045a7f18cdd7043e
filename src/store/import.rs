//! Log importer: reconciles the cache with the log.
//!
//! Runs at the start of every command. Compares the log's current
//! (inode, size, mtime) with the stored watermark and either does
//! nothing, applies the tail incrementally, or truncates the content
//! tables and rebuilds from offset zero.
//!
//! The row-apply functions here are also the write path's only way of
//! touching content tables: a mutation is exactly the replay of the
//! record it appends, so destroying the cache and rebuilding it from
//! the log reproduces the same state.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{CommentRecord, DepRecord, IssueRecord, Record};
use crate::store::log::{inode_of, mtime_ms_of, read_watermark, write_watermark, Watermark};
use crate::store::with_immediate_txn;

/// Reconcile the cache with the log.
///
/// # Errors
///
/// Returns an error on I/O or cache failure. Malformed log lines are
/// warned and skipped, never an error.
pub fn sync(conn: &mut Connection, log_path: &Path, lock: &File) -> Result<()> {
    let meta = match std::fs::metadata(log_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let wm = read_watermark(conn)?;
    let size = meta.len();
    let inode = inode_of(&meta);
    let mtime_ms = mtime_ms_of(&meta);

    if wm.inode != inode {
        debug!(stored = wm.inode, current = inode, "log inode changed, full reimport");
        full_reimport(conn, log_path, lock)
    } else if wm.offset > size {
        debug!(offset = wm.offset, size, "log truncated, full reimport");
        full_reimport(conn, log_path, lock)
    } else if wm.mtime_ms > mtime_ms {
        debug!(stored = wm.mtime_ms, current = mtime_ms, "log mtime went backwards, full reimport");
        full_reimport(conn, log_path, lock)
    } else if size == wm.offset {
        Ok(())
    } else {
        incremental_from(conn, log_path, lock, wm.offset)
    }
}

/// Truncate all content tables and rebuild from offset zero.
///
/// # Errors
///
/// Returns an error on cache or I/O failure.
pub fn full_reimport(conn: &mut Connection, log_path: &Path, lock: &File) -> Result<()> {
    with_immediate_txn(conn, |tx| {
        tx.execute_batch(
            "DELETE FROM comments;
             DELETE FROM issue_tags;
             DELETE FROM deps;
             DELETE FROM issues;
             DELETE FROM tags;
             DELETE FROM issues_fts;",
        )?;
        Ok(())
    })?;
    incremental_from(conn, log_path, lock, 0)
}

/// Apply the log tail starting at `offset`.
fn incremental_from(conn: &mut Connection, log_path: &Path, lock: &File, offset: u64) -> Result<()> {
    fs2::FileExt::lock_shared(lock)?;
    let read = read_tail(log_path, offset);
    let _ = fs2::FileExt::unlock(lock);
    let (bytes, meta) = read?;

    let consumed = bytes.len() as u64;
    let tail = String::from_utf8_lossy(&bytes);

    with_immediate_txn(conn, |tx| {
        apply_batch(tx, &tail)?;
        write_watermark(tx, &Watermark::at(offset + consumed, &meta))
    })?;
    debug!(offset, consumed, "applied log tail");
    Ok(())
}

fn read_tail(log_path: &Path, offset: u64) -> Result<(Vec<u8>, std::fs::Metadata)> {
    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let meta = file.metadata()?;
    Ok((bytes, meta))
}

/// Apply a batch of log lines inside an open transaction.
///
/// Issue and dep records apply eagerly; comments are buffered until
/// the whole batch has been seen, so a comment line that precedes its
/// issue line (a merged log) still lands.
pub(crate) fn apply_batch(tx: &Transaction, data: &str) -> Result<()> {
    let mut pending_comments: Vec<CommentRecord> = Vec::new();

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, preview = preview(line), "skipping unparseable log line");
                continue;
            }
        };
        if !value.is_object() {
            warn!(preview = preview(line), "skipping non-object log line");
            continue;
        }

        match serde_json::from_value::<Record>(value) {
            Ok(Record::Issue(rec)) => {
                apply_issue(tx, &rec)?;
            }
            Ok(Record::Comment(rec)) => pending_comments.push(rec),
            Ok(Record::Dep(rec)) => {
                apply_dep(tx, &rec)?;
            }
            Err(e) => {
                warn!(error = %e, preview = preview(line), "skipping malformed record");
            }
        }
    }

    for rec in pending_comments {
        apply_comment(tx, &rec)?;
    }
    Ok(())
}

fn preview(line: &str) -> &str {
    let end = line
        .char_indices()
        .nth(80)
        .map_or(line.len(), |(idx, _)| idx);
    &line[..end]
}

/// Apply an issue record with last-writer-wins conflict resolution.
///
/// The incoming record wins if its `rev` is byte-lexicographically
/// greater than the stored one, or equal with a later `updated_at`.
/// Tags fully replace the stored set; the FTS row is rewritten.
///
/// Returns whether the record was applied.
pub(crate) fn apply_issue(conn: &Connection, rec: &IssueRecord) -> Result<bool> {
    let stored: Option<(String, i64)> = conn
        .query_row(
            "SELECT rev, updated_at FROM issues WHERE id = ?1",
            [&rec.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((rev, updated_at)) = stored {
        let wins = rec.rev > rev || (rec.rev == rev && rec.updated_at > updated_at);
        if !wins {
            return Ok(false);
        }
    }

    // ON CONFLICT DO UPDATE keeps the rowid stable; the FTS row is
    // keyed by it.
    conn.execute(
        "INSERT INTO issues (id, title, body, status, priority, created_at, updated_at, rev)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             body = excluded.body,
             status = excluded.status,
             priority = excluded.priority,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at,
             rev = excluded.rev",
        rusqlite::params![
            rec.id,
            rec.title,
            rec.body,
            rec.status.as_str(),
            rec.priority.0,
            rec.created_at,
            rec.updated_at,
            rec.rev,
        ],
    )?;

    replace_tags(conn, &rec.id, &rec.tags)?;
    refresh_fts(conn, &rec.id)?;
    Ok(true)
}

/// Apply a dep record. The record wins only on a strictly greater
/// `rev`; tombstones flip state the same way, never delete.
pub(crate) fn apply_dep(conn: &Connection, rec: &DepRecord) -> Result<bool> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT rev FROM deps WHERE src_id = ?1 AND dst_id = ?2 AND kind = ?3",
            rusqlite::params![rec.src_id, rec.dst_id, rec.kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(rev) = stored {
        if rec.rev <= rev {
            return Ok(false);
        }
    }

    conn.execute(
        "INSERT INTO deps (src_id, dst_id, kind, state, created_at, rev)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(src_id, dst_id, kind) DO UPDATE SET
             state = excluded.state,
             created_at = excluded.created_at,
             rev = excluded.rev",
        rusqlite::params![
            rec.src_id,
            rec.dst_id,
            rec.kind.as_str(),
            rec.state.as_str(),
            rec.created_at,
            rec.rev,
        ],
    )?;
    Ok(true)
}

/// Apply a comment record: insert-or-ignore keyed by id.
///
/// Skips (with a warning) when the target issue is absent; the
/// buffered pass in `apply_batch` reduces this to genuinely dangling
/// comments.
pub(crate) fn apply_comment(conn: &Connection, rec: &CommentRecord) -> Result<bool> {
    let issue_exists: bool = conn
        .query_row("SELECT 1 FROM issues WHERE id = ?1", [&rec.issue_id], |_| {
            Ok(())
        })
        .optional()?
        .is_some();
    if !issue_exists {
        warn!(comment = %rec.id, issue = %rec.issue_id, "skipping comment for missing issue");
        return Ok(false);
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO comments (id, issue_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![rec.id, rec.issue_id, rec.body, rec.created_at],
    )?;
    if inserted == 0 {
        return Ok(false);
    }

    refresh_fts(conn, &rec.issue_id)?;
    Ok(true)
}

/// Replace an issue's tag set.
pub(crate) fn replace_tags(conn: &Connection, issue_id: &str, tags: &[String]) -> Result<()> {
    conn.execute("DELETE FROM issue_tags WHERE issue_id = ?1", [issue_id])?;
    let mut insert_tag = conn.prepare_cached("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?;
    let mut link = conn.prepare_cached(
        "INSERT OR IGNORE INTO issue_tags (issue_id, tag_id)
         SELECT ?1, id FROM tags WHERE name = ?2",
    )?;
    for tag in tags {
        insert_tag.execute([tag])?;
        link.execute(rusqlite::params![issue_id, tag])?;
    }
    Ok(())
}

/// Rewrite the FTS row for an issue from its current title, body, and
/// comment bodies in chronological order, newline-separated.
pub(crate) fn refresh_fts(conn: &Connection, issue_id: &str) -> Result<()> {
    let row: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT rowid, title, body FROM issues WHERE id = ?1",
            [issue_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((rowid, title, body)) = row else {
        return Ok(());
    };

    let mut stmt = conn.prepare_cached(
        "SELECT body FROM comments WHERE issue_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let comments = stmt
        .query_map([issue_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .join("\n");

    conn.execute("DELETE FROM issues_fts WHERE rowid = ?1", [rowid])?;
    conn.execute(
        "INSERT INTO issues_fts (rowid, title, body, comments) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![rowid, title, body, comments],
    )?;
    Ok(())
}
