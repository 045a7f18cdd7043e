//! The dual-storage engine.
//!
//! `issues.jsonl` is the durable, append-only source of truth;
//! `issues.db` is a derived cache with full-text search. Every
//! mutation updates both under an immediate cache transaction plus an
//! exclusive advisory lock on the sibling `lock` file, so concurrent
//! processes serialize on the writer slot and the log never gets
//! ahead of a committed cache in this process.
//!
//! If the log is appended but the cache commit fails, the next
//! incremental reimport applies the orphaned record: the pairing is
//! self-healing in exactly one direction, which is why the log write
//! happens inside the cache transaction.

pub mod import;
pub mod log;
pub mod maintenance;
pub mod query;
pub mod schema;

use std::fs::File;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{Result, TissueError};
use crate::model::{
    Comment, CommentRecord, Dep, DepKind, DepRecord, DepState, Issue, IssueRecord, Priority,
    Record, Status,
};
use crate::util::id::mint_issue_id;
use crate::util::id::normalize_prefix;
use crate::util::rev::RevGenerator;
use crate::util::time::now_ms;

pub use maintenance::{CleanReport, MigrateReport};
pub use query::ListFilter;

pub const DB_FILE: &str = "issues.db";
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Everything the cache derives from stays tracked; everything
/// derived or transient is ignored.
const GITIGNORE_CONTENT: &str = "issues.db\nissues.db-shm\nissues.db-wal\nlock\n";

const META_PREFIX_KEY: &str = "id_prefix";

/// Fields for a new issue. Status is always `open` at birth.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Field-level partial update. Omitted fields carry forward.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl IssuePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }
}

/// An open store: cache connection, log path, lock handle, and the
/// configured id prefix.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    dir: PathBuf,
    log_path: PathBuf,
    lock: File,
    prefix: String,
    revs: RevGenerator,
}

impl Store {
    /// Create (or complete) a store directory and open it.
    ///
    /// Lays down an empty log, the `.gitignore`, and the cache, then
    /// persists the id prefix: the explicit one if given, otherwise
    /// the normalized basename of the directory's parent, falling
    /// back to `tissue`. Re-running on an existing store is harmless
    /// and only overrides the prefix when one is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or cache failure, or `InvalidPrefix`.
    pub fn init(dir: &Path, prefix: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        log::ensure_log(dir)?;
        let gitignore = dir.join(GITIGNORE_FILE);
        if !gitignore.exists() {
            std::fs::write(&gitignore, GITIGNORE_CONTENT)?;
        }

        let mut store = Self::open_parts(dir)?;
        match prefix {
            Some(explicit) => {
                store.set_prefix(explicit)?;
            }
            None => store.load_or_derive_prefix()?,
        }
        store.sync()?;
        Ok(store)
    }

    /// Open an existing store.
    ///
    /// Reconciles the cache with the log before returning, so every
    /// command starts from a consistent view.
    ///
    /// # Errors
    ///
    /// `StoreNotFound` if `dir` is not a directory; otherwise I/O or
    /// cache errors.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(TissueError::StoreNotFound {
                path: dir.to_path_buf(),
            });
        }
        log::ensure_log(dir)?;
        let mut store = Self::open_parts(dir)?;
        store.load_or_derive_prefix()?;
        store.sync()?;
        Ok(store)
    }

    fn open_parts(dir: &Path) -> Result<Self> {
        let conn = Connection::open(dir.join(DB_FILE))?;
        schema::apply_schema(&conn)?;
        let lock = log::open_lock_file(dir)?;
        Ok(Self {
            conn,
            dir: dir.to_path_buf(),
            log_path: dir.join(log::LOG_FILE),
            lock,
            prefix: String::new(),
            revs: RevGenerator::new(),
        })
    }

    /// The configured id prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Normalize and persist a new id prefix.
    ///
    /// # Errors
    ///
    /// `InvalidPrefix` if the input normalizes to nothing.
    pub fn set_prefix(&mut self, input: &str) -> Result<String> {
        let normalized = normalize_prefix(input)?;
        meta_set(&self.conn, META_PREFIX_KEY, &normalized)?;
        self.prefix = normalized.clone();
        Ok(normalized)
    }

    /// Load the persisted prefix, deriving and persisting a default
    /// when the cache has none (fresh store, or a cache rebuilt from
    /// scratch).
    fn load_or_derive_prefix(&mut self) -> Result<()> {
        if let Some(stored) = meta_get(&self.conn, META_PREFIX_KEY)? {
            self.prefix = stored;
            return Ok(());
        }
        let derived = derive_default_prefix(&self.dir);
        meta_set(&self.conn, META_PREFIX_KEY, &derived)?;
        self.prefix = derived;
        Ok(())
    }

    /// Reconcile the cache with the log (incremental or full, per the
    /// watermark decision table).
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or cache failure.
    pub fn sync(&mut self) -> Result<()> {
        import::sync(&mut self.conn, &self.log_path, &self.lock)
    }

    /// Discard the cache contents and rebuild from the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or cache failure.
    pub fn force_reimport(&mut self) -> Result<()> {
        log::ensure_log(&self.dir)?;
        import::full_reimport(&mut self.conn, &self.log_path, &self.lock)
    }

    /// Create an empty log file if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn ensure_log(&self) -> Result<()> {
        log::ensure_log(&self.dir)
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Create a new issue. Returns it with its minted id.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty title, `InvalidPriority` out of
    /// 1..=5, `IssueIdCollision` after exhausting nonces,
    /// `DatabaseBusy` when retries run out.
    pub fn create_issue(&mut self, new: &NewIssue) -> Result<Issue> {
        if new.title.trim().is_empty() {
            return Err(TissueError::validation("title", "cannot be empty"));
        }
        if !new.priority.in_range() {
            return Err(TissueError::InvalidPriority {
                priority: new.priority.0,
            });
        }

        let prefix = self.prefix.clone();
        let mut tags = new.tags.clone();
        tags.sort();
        tags.dedup();

        self.write_op(|tx, revs| {
            let now = now_ms();
            let id = mint_issue_id(&prefix, &new.title, &new.body, now, |candidate| {
                issue_exists(tx, candidate)
            })?;
            let issue = Issue {
                id,
                title: new.title.clone(),
                body: new.body.clone(),
                status: Status::Open,
                priority: new.priority,
                created_at: now,
                updated_at: now,
                rev: revs.next(),
                tags: tags.clone(),
            };
            let rec = IssueRecord::from(&issue);
            import::apply_issue(tx, &rec)?;
            Ok((issue, vec![Record::Issue(rec)]))
        })
    }

    /// Partially update an issue. `id` must already be resolved.
    ///
    /// Tag removals apply after additions, so a tag in both lists is
    /// a net removal. The final set is sorted.
    ///
    /// # Errors
    ///
    /// `IssueNotFound`, validation errors, or `DatabaseBusy`.
    pub fn update_issue(&mut self, id: &str, patch: &IssuePatch) -> Result<Issue> {
        if let Some(ref title) = patch.title {
            if title.trim().is_empty() {
                return Err(TissueError::validation("title", "cannot be empty"));
            }
        }
        if let Some(ref status) = patch.status {
            if matches!(status, Status::Custom(_)) {
                return Err(TissueError::InvalidStatus {
                    status: status.as_str().to_string(),
                });
            }
        }
        if let Some(priority) = patch.priority {
            if !priority.in_range() {
                return Err(TissueError::InvalidPriority {
                    priority: priority.0,
                });
            }
        }

        self.write_op(|tx, revs| {
            let mut issue = query::get_issue(tx, id)?;

            if let Some(ref title) = patch.title {
                issue.title = title.clone();
            }
            if let Some(ref body) = patch.body {
                issue.body = body.clone();
            }
            if let Some(ref status) = patch.status {
                issue.status = status.clone();
            }
            if let Some(priority) = patch.priority {
                issue.priority = priority;
            }

            let mut tags = issue.tags.clone();
            tags.extend(patch.add_tags.iter().cloned());
            tags.retain(|t| !patch.remove_tags.contains(t));
            tags.sort();
            tags.dedup();
            issue.tags = tags;

            issue.updated_at = now_ms().max(issue.created_at);
            issue.rev = revs.next();

            let rec = IssueRecord::from(&issue);
            import::apply_issue(tx, &rec)?;
            Ok((issue, vec![Record::Issue(rec)]))
        })
    }

    /// Append an immutable comment to an issue.
    ///
    /// # Errors
    ///
    /// `IssueNotFound`, or `DatabaseBusy`.
    pub fn add_comment(&mut self, issue_id: &str, body: &str) -> Result<Comment> {
        self.write_op(|tx, revs| {
            let comment = Comment {
                id: revs.next(),
                issue_id: issue_id.to_string(),
                body: body.to_string(),
                created_at: now_ms(),
            };
            let rec = CommentRecord::from(&comment);
            if !import::apply_comment(tx, &rec)? {
                return Err(TissueError::IssueNotFound {
                    input: issue_id.to_string(),
                });
            }
            Ok((comment, vec![Record::Comment(rec)]))
        })
    }

    /// Record an active dependency edge. `src` blocks (or parents, or
    /// relates to) `dst`; both must be resolved ids.
    ///
    /// `relates` edges are canonicalized to ascending endpoint order,
    /// which makes the pair's direction irrelevant for uniqueness.
    ///
    /// # Errors
    ///
    /// `SelfDependency`, `InvalidDepKind` for a custom kind, or
    /// `DatabaseBusy`.
    pub fn add_dep(&mut self, src: &str, dst: &str, kind: &DepKind) -> Result<Dep> {
        self.put_dep(src, dst, kind, DepState::Active)
    }

    /// Tombstone a dependency edge. Never a physical delete.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Store::add_dep`].
    pub fn remove_dep(&mut self, src: &str, dst: &str, kind: &DepKind) -> Result<Dep> {
        self.put_dep(src, dst, kind, DepState::Removed)
    }

    fn put_dep(&mut self, src: &str, dst: &str, kind: &DepKind, state: DepState) -> Result<Dep> {
        if matches!(kind, DepKind::Custom(_)) {
            return Err(TissueError::InvalidDepKind {
                kind: kind.as_str().to_string(),
            });
        }
        if src == dst {
            return Err(TissueError::SelfDependency {
                id: src.to_string(),
            });
        }
        let (src, dst) = if kind.is_symmetric() && src > dst {
            (dst, src)
        } else {
            (src, dst)
        };

        self.write_op(|tx, revs| {
            let dep = Dep {
                src_id: src.to_string(),
                dst_id: dst.to_string(),
                kind: kind.clone(),
                state: state.clone(),
                created_at: now_ms(),
                rev: revs.next(),
            };
            let rec = DepRecord::from(&dep);
            import::apply_dep(tx, &rec)?;
            Ok((dep, vec![Record::Dep(rec)]))
        })
    }

    /// Run `op` inside an immediate cache transaction, append the
    /// records it produced to the log under the exclusive lock, and
    /// commit. Retries the whole operation on contention.
    fn write_op<T, F>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>, &mut RevGenerator) -> Result<(T, Vec<Record>)>,
    {
        let mut backoff = Backoff::operation();
        loop {
            let attempt = with_immediate_txn(&mut self.conn, |tx| {
                let (value, records) = op(tx, &mut self.revs)?;
                log::append_records(tx, &self.log_path, &self.lock, &records)?;
                Ok(value)
            });
            match attempt {
                Err(e) if e.is_busy() => {
                    if backoff.wait() {
                        debug!("write contention, retrying operation");
                        continue;
                    }
                    return Err(TissueError::DatabaseBusy);
                }
                other => return other,
            }
        }
    }

    // ========================================================================
    // Query path
    // ========================================================================

    /// Resolve user input to a unique issue id.
    ///
    /// # Errors
    ///
    /// See [`query::resolve_id`].
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        query::resolve_id(&self.conn, input)
    }

    /// Fetch one issue with tags.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if absent.
    pub fn get_issue(&self, id: &str) -> Result<Issue> {
        query::get_issue(&self.conn, id)
    }

    /// An issue's comments, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error on cache failure.
    pub fn get_comments(&self, issue_id: &str) -> Result<Vec<Comment>> {
        query::get_comments(&self.conn, issue_id)
    }

    /// Active deps touching an issue from either side.
    ///
    /// # Errors
    ///
    /// Returns an error on cache failure.
    pub fn get_deps(&self, issue_id: &str) -> Result<Vec<Dep>> {
        query::get_deps(&self.conn, issue_id)
    }

    /// List issues with optional filters.
    ///
    /// # Errors
    ///
    /// Returns an error on cache failure.
    pub fn list_issues(&self, filter: &ListFilter) -> Result<Vec<Issue>> {
        query::list_issues(&self.conn, filter)
    }

    /// Open issues with no transitive active blocker.
    ///
    /// # Errors
    ///
    /// Returns an error on cache failure.
    pub fn list_ready(&self, limit: Option<usize>) -> Result<Vec<Issue>> {
        query::list_ready(&self.conn, limit)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Remove terminal issues from the log. See [`maintenance::clean`].
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or cache failure.
    pub fn clean(&mut self, older_than_days: Option<i64>, force: bool) -> Result<CleanReport> {
        maintenance::clean(&mut self.conn, &self.log_path, &self.lock, older_than_days, force)
    }

    /// Splice another store's log into this one. See
    /// [`maintenance::migrate`].
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or cache failure, or `StoreNotFound`
    /// for a missing source log.
    pub fn migrate(&mut self, src_dir: &Path, force: bool) -> Result<MigrateReport> {
        maintenance::migrate(&mut self.conn, &self.log_path, &self.lock, src_dir, force)
    }
}

/// Run a closure inside an immediate transaction, retrying the BEGIN
/// on busy with the short statement-level backoff. The transaction
/// rolls back if the closure errors.
pub(crate) fn with_immediate_txn<T, F>(conn: &mut Connection, mut f: F) -> Result<T>
where
    F: FnMut(&Transaction<'_>) -> Result<T>,
{
    let mut backoff = Backoff::statement();
    loop {
        let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(e) if sqlite_busy(&e) => {
                if backoff.wait() {
                    continue;
                }
                return Err(TissueError::DatabaseBusy);
            }
            Err(e) => return Err(e.into()),
        };
        let value = f(&tx)?;
        tx.commit()?;
        return Ok(value);
    }
}

fn sqlite_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if matches!(
            err.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        )
    )
}

fn issue_exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM issues WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn meta_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?)
}

fn meta_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

fn derive_default_prefix(dir: &Path) -> String {
    let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    canonical
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .and_then(|name| normalize_prefix(name).ok())
        .unwrap_or_else(|| "tissue".to_string())
}

/// Bounded linear backoff for contention retries.
struct Backoff {
    attempt: u32,
    max_attempts: u32,
    base_ms: u64,
    step_ms: u64,
    cap_ms: u64,
}

impl Backoff {
    /// Short loop around individual cache statements: 50-500 ms, up
    /// to 10 attempts.
    const fn statement() -> Self {
        Self {
            attempt: 0,
            max_attempts: 10,
            base_ms: 50,
            step_ms: 50,
            cap_ms: 500,
        }
    }

    /// Coarse loop around a whole operation: 10-200 ms, up to 50
    /// attempts.
    const fn operation() -> Self {
        Self {
            attempt: 0,
            max_attempts: 50,
            base_ms: 10,
            step_ms: 4,
            cap_ms: 200,
        }
    }

    /// Sleep for the next interval. Returns false once attempts are
    /// exhausted.
    fn wait(&mut self) -> bool {
        if self.attempt >= self.max_attempts {
            return false;
        }
        let delay = (self.base_ms + u64::from(self.attempt) * self.step_ms).min(self.cap_ms);
        std::thread::sleep(std::time::Duration::from_millis(delay));
        self.attempt += 1;
        true
    }
}
