//! The durable log: locked appends and the importer watermark.
//!
//! `issues.jsonl` holds one JSON record per line and is the source of
//! truth; everything else is derived. Writers serialize the
//! append + fsync + watermark-update sequence behind an exclusive
//! advisory lock on the sibling `lock` file so that no reader can
//! observe a log position the cache has not accounted for.

use std::fs::{File, Metadata, OpenOptions};
use std::io::Write;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::model::Record;

pub const LOG_FILE: &str = "issues.jsonl";
pub const LOCK_FILE: &str = "lock";

/// How far the importer has consumed the log, plus the file identity
/// captured at that point. Stored in the `meta` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark {
    /// Byte offset through which the log has been applied.
    pub offset: u64,
    /// Inode of the log file when the offset was recorded (0 where
    /// the platform has no inode numbers).
    pub inode: u64,
    /// Modification time in epoch milliseconds.
    pub mtime_ms: i64,
}

impl Watermark {
    /// Capture the identity of the log file at `offset`.
    #[must_use]
    pub fn at(offset: u64, meta: &Metadata) -> Self {
        Self {
            offset,
            inode: inode_of(meta),
            mtime_ms: mtime_ms_of(meta),
        }
    }
}

#[cfg(unix)]
#[must_use]
pub fn inode_of(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
#[must_use]
pub fn inode_of(_meta: &Metadata) -> u64 {
    0
}

#[must_use]
pub fn mtime_ms_of(meta: &Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

/// Read the stored watermark. Absent keys read as zero, which forces
/// a full reimport on first contact with a log.
pub fn read_watermark(conn: &Connection) -> Result<Watermark> {
    let get = |key: &str| -> Result<Option<String>> {
        Ok(conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    };
    Ok(Watermark {
        offset: get("jsonl_offset")?.and_then(|v| v.parse().ok()).unwrap_or(0),
        inode: get("jsonl_inode")?.and_then(|v| v.parse().ok()).unwrap_or(0),
        mtime_ms: get("jsonl_mtime")?.and_then(|v| v.parse().ok()).unwrap_or(0),
    })
}

/// Persist the watermark through the caller's open transaction.
pub fn write_watermark(conn: &Connection, wm: &Watermark) -> Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)")?;
    stmt.execute(rusqlite::params!["jsonl_offset", wm.offset.to_string()])?;
    stmt.execute(rusqlite::params!["jsonl_inode", wm.inode.to_string()])?;
    stmt.execute(rusqlite::params!["jsonl_mtime", wm.mtime_ms.to_string()])?;
    Ok(())
}

/// Append records to the log under the exclusive lock.
///
/// Serializes each record, appends with a trailing newline, fsyncs,
/// then records the new watermark through `conn` (the caller's open
/// cache transaction) so this process never re-ingests its own
/// writes. The cache commit and the fsync stand or fall together: if
/// the caller's transaction rolls back after this returns, the next
/// incremental reimport re-applies the appended records.
///
/// # Errors
///
/// Returns an error on lock, I/O, serialization, or cache failure.
pub fn append_records(
    conn: &Connection,
    log_path: &Path,
    lock: &File,
    records: &[Record],
) -> Result<()> {
    fs2::FileExt::lock_exclusive(lock)?;
    let result = append_locked(conn, log_path, records);
    let _ = fs2::FileExt::unlock(lock);
    result
}

fn append_locked(conn: &Connection, log_path: &Path, records: &[Record]) -> Result<()> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }

    let mut file = OpenOptions::new().append(true).create(true).open(log_path)?;
    file.write_all(buf.as_bytes())?;
    file.sync_all()?;

    let meta = file.metadata()?;
    write_watermark(conn, &Watermark::at(meta.len(), &meta))
}

/// Open (creating if absent) the lock file used as the advisory lock
/// target.
pub fn open_lock_file(dir: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(LOCK_FILE))?)
}

/// Create an empty log file if none exists.
pub fn ensure_log(dir: &Path) -> Result<()> {
    let path = dir.join(LOG_FILE);
    if !path.exists() {
        std::fs::write(&path, "")?;
    }
    Ok(())
}
