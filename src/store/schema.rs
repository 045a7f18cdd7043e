//! Cache schema and connection setup.
//!
//! The cache is strictly derived from the JSONL log; every table here
//! can be truncated and rebuilt by the importer. The FTS table's rowid
//! mirrors the owning issue's rowid in `issues`, which is why issue
//! upserts must preserve rowids (ON CONFLICT DO UPDATE, never
//! INSERT OR REPLACE).

use rusqlite::Connection;

use crate::error::Result;

/// Cache busy timeout. Writers block this long on the writer slot
/// before a statement surfaces SQLITE_BUSY.
pub const BUSY_TIMEOUT_MS: u64 = 300_000;

/// The complete DDL. Idempotent: every statement is IF NOT EXISTS.
pub const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS issues (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        priority INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        rev TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
    CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority);
    CREATE INDEX IF NOT EXISTS idx_issues_updated_at ON issues(updated_at);

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS issue_tags (
        issue_id TEXT NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (issue_id, tag_id),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE,
        FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_issue_tags_tag_id ON issue_tags(tag_id);

    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        issue_id TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_comments_issue_id ON comments(issue_id);

    -- Dep endpoints carry no foreign keys: the importer applies dep
    -- records eagerly, possibly before either endpoint's issue line.
    CREATE TABLE IF NOT EXISTS deps (
        src_id TEXT NOT NULL,
        dst_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        rev TEXT NOT NULL,
        PRIMARY KEY (src_id, dst_id, kind)
    );
    CREATE INDEX IF NOT EXISTS idx_deps_dst_id ON deps(dst_id);

    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS issues_fts USING fts5(title, body, comments);
";

/// Apply pragmas and the schema to a freshly opened connection.
///
/// # Errors
///
/// Returns an error if a pragma or DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
