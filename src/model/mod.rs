//! Core data types for tissue.
//!
//! - `Issue` - the tracked work item
//! - `Status` - issue lifecycle states
//! - `Comment` - immutable issue comments
//! - `Dep` - directed relationships between issues
//! - `Record` - the tagged-union wire format of the JSONL log
//!
//! All timestamps are Unix epoch milliseconds (signed 64-bit).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue lifecycle status.
///
/// The `Custom` variant carries any value outside the canonical set
/// verbatim. The log importer persists such values so that records
/// written by a newer version of the software survive a round-trip
/// through this one; the write path rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Paused,
    Duplicate,
    Closed,
    #[serde(untagged)]
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Duplicate => "duplicate",
            Self::Closed => "closed",
            Self::Custom(value) => value,
        }
    }

    /// Active statuses can block other issues.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::Paused)
    }

    /// Terminal statuses are eligible for `clean`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Duplicate)
    }

    /// Lenient conversion for values read back from the cache or log.
    #[must_use]
    pub fn from_raw(value: &str) -> Self {
        match value {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "paused" => Self::Paused,
            "duplicate" => Self::Duplicate,
            "closed" => Self::Closed,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = crate::error::TissueError;

    /// Strict parse used by the write path: only the canonical five.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "paused" => Ok(Self::Paused),
            "duplicate" => Ok(Self::Duplicate),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::TissueError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Issue priority, 1 (highest) through 5. Default 2.
///
/// Stored as a plain integer so that out-of-range values arriving
/// through the log are preserved; the write path validates the range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Priority(pub i64);

impl Priority {
    pub const DEFAULT: Self = Self(2);

    #[must_use]
    pub const fn in_range(self) -> bool {
        self.0 >= 1 && self.0 <= 5
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = crate::error::TissueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let val = s.strip_prefix(['p', 'P']).unwrap_or(s);
        match val.parse::<i64>() {
            Ok(p) if (1..=5).contains(&p) => Ok(Self(p)),
            Ok(p) => Err(crate::error::TissueError::InvalidPriority { priority: p }),
            Err(_) => Err(crate::error::TissueError::InvalidPriority { priority: -1 }),
        }
    }
}

/// Dependency relationship kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepKind {
    Blocks,
    Parent,
    Relates,
    #[serde(untagged)]
    Custom(String),
}

impl DepKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blocks => "blocks",
            Self::Parent => "parent",
            Self::Relates => "relates",
            Self::Custom(value) => value,
        }
    }

    /// `relates` edges are symmetric and stored with endpoints in
    /// ascending order; `blocks` and `parent` are directional.
    #[must_use]
    pub const fn is_symmetric(&self) -> bool {
        matches!(self, Self::Relates)
    }
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DepKind {
    type Err = crate::error::TissueError;

    /// Strict parse used by the write path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocks" => Ok(Self::Blocks),
            "parent" => Ok(Self::Parent),
            "relates" => Ok(Self::Relates),
            other => Err(crate::error::TissueError::InvalidDepKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Dependency lifecycle state. Removal is a tombstone, never a delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepState {
    #[default]
    Active,
    Removed,
    #[serde(untagged)]
    Custom(String),
}

impl DepState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for DepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The tracked work item as returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique id, `<prefix>-<hash>` with an 8-char base36 hash.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Always >= `created_at`.
    pub updated_at: i64,
    /// 26-char revision token; greater token wins on conflict.
    pub rev: String,
    /// Sorted ascending.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An immutable comment on an issue. The id doubles as a revision
/// token, so comments sort chronologically by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub body: String,
    pub created_at: i64,
}

/// A directed dependency edge between two issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dep {
    pub src_id: String,
    pub dst_id: String,
    pub kind: DepKind,
    pub state: DepState,
    pub created_at: i64,
    pub rev: String,
}

/// One line of the JSONL log.
///
/// Field order inside each variant is the wire order; third-party
/// tools parse these lines, so key names and ordering are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Issue(IssueRecord),
    Comment(CommentRecord),
    Dep(DepRecord),
}

/// Full-row issue snapshot. Every issue mutation appends one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: String,
    pub rev: String,
    pub title: String,
    pub body: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub issue_id: String,
    pub body: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepRecord {
    pub src_id: String,
    pub dst_id: String,
    pub kind: DepKind,
    pub state: DepState,
    pub created_at: i64,
    pub rev: String,
}

impl From<&Issue> for IssueRecord {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            rev: issue.rev.clone(),
            title: issue.title.clone(),
            body: issue.body.clone(),
            status: issue.status.clone(),
            priority: issue.priority,
            tags: issue.tags.clone(),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

impl From<&Comment> for CommentRecord {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            issue_id: comment.issue_id.clone(),
            body: comment.body.clone(),
            created_at: comment.created_at,
        }
    }
}

impl From<&Dep> for DepRecord {
    fn from(dep: &Dep) -> Self {
        Self {
            src_id: dep.src_id.clone(),
            dst_id: dep.dst_id.clone(),
            kind: dep.kind.clone(),
            state: dep.state.clone(),
            created_at: dep.created_at,
            rev: dep.rev.clone(),
        }
    }
}
