//! Read-only queries against the cache.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{Result, TissueError};
use crate::model::{Comment, Dep, DepKind, DepState, Issue, Priority, Status};
use crate::util::id::{hash_portion, validate_lookup_input};

/// Filters for `list_issues`. All optional; all AND-combined.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Exact status match. Accepts values outside the canonical set so
    /// that log-imported rows with unknown statuses remain reachable.
    pub status: Option<String>,
    /// Exact tag match.
    pub tag: Option<String>,
    /// Full-text query over title, body, and comments.
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Resolve user input to a unique issue id.
///
/// Tries, in order: exact match; unique prefix match; and, only when
/// the input contains no `-`, unique hash-suffix match with
/// case-folded verification.
///
/// # Errors
///
/// `InvalidIdPrefix` for disallowed characters, `IssueIdAmbiguous`
/// when more than one issue matches, `IssueNotFound` otherwise.
pub fn resolve_id(conn: &Connection, input: &str) -> Result<String> {
    validate_lookup_input(input)?;

    let exact: Option<String> = conn
        .query_row("SELECT id FROM issues WHERE id = ?1", [input], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = exact {
        return Ok(id);
    }

    let prefix_matches = matching_ids(conn, "SELECT id FROM issues WHERE id LIKE ?1 || '%' ORDER BY id", input)?;
    match prefix_matches.len() {
        1 => return Ok(prefix_matches.into_iter().next().unwrap()),
        n if n > 1 => {
            return Err(TissueError::IssueIdAmbiguous {
                input: input.to_string(),
                matches: prefix_matches,
            })
        }
        _ => {}
    }

    if !input.contains('-') {
        let folded = input.to_lowercase();
        let candidates = matching_ids(
            conn,
            "SELECT id FROM issues WHERE id LIKE '%-' || ?1 || '%' ORDER BY id",
            input,
        )?;
        let verified: Vec<String> = candidates
            .into_iter()
            .filter(|id| hash_portion(id).starts_with(&folded))
            .collect();
        match verified.len() {
            1 => return Ok(verified.into_iter().next().unwrap()),
            n if n > 1 => {
                return Err(TissueError::IssueIdAmbiguous {
                    input: input.to_string(),
                    matches: verified,
                })
            }
            _ => {}
        }
    }

    Err(TissueError::IssueNotFound {
        input: input.to_string(),
    })
}

fn matching_ids(conn: &Connection, sql: &str, input: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([input], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Fetch one issue with its tag set.
///
/// # Errors
///
/// `IssueNotFound` if the id is absent.
pub fn get_issue(conn: &Connection, id: &str) -> Result<Issue> {
    let issue = conn
        .query_row(
            "SELECT id, title, body, status, priority, created_at, updated_at, rev
             FROM issues WHERE id = ?1",
            [id],
            issue_from_row,
        )
        .optional()?;
    let Some(mut issue) = issue else {
        return Err(TissueError::IssueNotFound {
            input: id.to_string(),
        });
    };
    issue.tags = tags_for(conn, id)?;
    Ok(issue)
}

/// An issue's comments, ascending by creation time.
pub fn get_comments(conn: &Connection, issue_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, issue_id, body, created_at FROM comments
         WHERE issue_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let comments = stmt
        .query_map([issue_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                issue_id: row.get(1)?,
                body: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Active deps touching an issue from either side, ordered by kind
/// then creation time.
pub fn get_deps(conn: &Connection, issue_id: &str) -> Result<Vec<Dep>> {
    let mut stmt = conn.prepare_cached(
        "SELECT src_id, dst_id, kind, state, created_at, rev FROM deps
         WHERE state = 'active' AND (src_id = ?1 OR dst_id = ?1)
         ORDER BY kind ASC, created_at ASC",
    )?;
    let deps = stmt
        .query_map([issue_id], dep_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(deps)
}

/// List issues with optional status, tag, full-text, and limit
/// filters.
///
/// With a search query, ranking is bm25 with titles weighted above
/// bodies above comments, tie-broken by recency; otherwise recency
/// alone.
pub fn list_issues(conn: &Connection, filter: &ListFilter) -> Result<Vec<Issue>> {
    let mut sql = String::from(
        "SELECT i.id, i.title, i.body, i.status, i.priority, i.created_at, i.updated_at, i.rev
         FROM issues i",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if filter.tag.is_some() {
        sql.push_str(
            " JOIN issue_tags it ON it.issue_id = i.id
              JOIN tags t ON t.id = it.tag_id",
        );
    }
    if filter.search.is_some() {
        sql.push_str(" JOIN issues_fts ON issues_fts.rowid = i.rowid");
    }

    sql.push_str(" WHERE 1=1");
    if let Some(ref status) = filter.status {
        sql.push_str(" AND i.status = ?");
        params.push(Box::new(status.clone()));
    }
    if let Some(ref tag) = filter.tag {
        sql.push_str(" AND t.name = ?");
        params.push(Box::new(tag.clone()));
    }
    if let Some(ref search) = filter.search {
        sql.push_str(" AND issues_fts MATCH ?");
        params.push(Box::new(search.clone()));
    }

    if filter.search.is_some() {
        sql.push_str(" ORDER BY bm25(issues_fts, 1.0, 0.5, 0.25) ASC, i.updated_at DESC");
    } else {
        sql.push_str(" ORDER BY i.updated_at DESC");
    }

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params.push(Box::new(limit as i64));
    }

    collect_issues(conn, &sql, &params)
}

/// Open issues not transitively blocked by any active issue.
///
/// The recursive CTE seeds from `blocks` edges whose source is active
/// and walks forward; UNION gives the visited set that makes cycles
/// terminate. Ordered by priority then recency.
pub fn list_ready(conn: &Connection, limit: Option<usize>) -> Result<Vec<Issue>> {
    let mut sql = String::from(
        "WITH RECURSIVE blocked(id) AS (
             SELECT d.dst_id FROM deps d
               JOIN issues s ON s.id = d.src_id
              WHERE d.kind = 'blocks' AND d.state = 'active'
                AND s.status IN ('open', 'in_progress', 'paused')
             UNION
             SELECT d.dst_id FROM deps d
               JOIN blocked b ON d.src_id = b.id
              WHERE d.kind = 'blocks' AND d.state = 'active'
         )
         SELECT i.id, i.title, i.body, i.status, i.priority, i.created_at, i.updated_at, i.rev
         FROM issues i
         WHERE i.status = 'open' AND i.id NOT IN (SELECT id FROM blocked)
         ORDER BY i.priority ASC, i.updated_at DESC",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        params.push(Box::new(limit as i64));
    }
    collect_issues(conn, &sql, &params)
}

/// Terminal-status issues, optionally only those untouched since
/// `updated_before`. Used by `clean`.
pub fn list_terminal(conn: &Connection, updated_before: Option<i64>) -> Result<Vec<Issue>> {
    let mut sql = String::from(
        "SELECT i.id, i.title, i.body, i.status, i.priority, i.created_at, i.updated_at, i.rev
         FROM issues i WHERE i.status IN ('closed', 'duplicate')",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(cutoff) = updated_before {
        sql.push_str(" AND i.updated_at < ?");
        params.push(Box::new(cutoff));
    }
    sql.push_str(" ORDER BY i.updated_at ASC");
    collect_issues(conn, &sql, &params)
}

fn collect_issues(
    conn: &Connection,
    sql: &str,
    params: &[Box<dyn rusqlite::ToSql>],
) -> Result<Vec<Issue>> {
    let mut stmt = conn.prepare(sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
    let mut issues = stmt
        .query_map(param_refs.as_slice(), issue_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for issue in &mut issues {
        issue.tags = tags_for(conn, &issue.id)?;
    }
    Ok(issues)
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        status: Status::from_raw(&row.get::<_, String>(3)?),
        priority: Priority(row.get(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        rev: row.get(7)?,
        tags: Vec::new(),
    })
}

fn dep_from_row(row: &Row<'_>) -> rusqlite::Result<Dep> {
    let kind: String = row.get(2)?;
    let state: String = row.get(3)?;
    Ok(Dep {
        src_id: row.get(0)?,
        dst_id: row.get(1)?,
        kind: kind
            .parse::<DepKind>()
            .unwrap_or(DepKind::Custom(kind)),
        state: match state.as_str() {
            "active" => DepState::Active,
            "removed" => DepState::Removed,
            _ => DepState::Custom(state),
        },
        created_at: row.get(4)?,
        rev: row.get(5)?,
    })
}

fn tags_for(conn: &Connection, issue_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.name FROM tags t
         JOIN issue_tags it ON it.tag_id = t.id
         WHERE it.issue_id = ?1 ORDER BY t.name ASC",
    )?;
    let tags = stmt
        .query_map([issue_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}
