//! Human-facing rendering. JSON output bypasses this module entirely;
//! commands serialize typed results with serde_json directly.

use colored::Colorize;

use crate::model::{Comment, Dep, Issue, Status};
use crate::util::time::format_ms;

/// Render a table of issues: id, priority, status, updated, tags,
/// title.
#[must_use]
pub fn issue_table(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No issues found.".to_string();
    }

    let id_width = issues.iter().map(|i| i.id.len()).max().unwrap_or(2).max(2);
    let status_width = issues
        .iter()
        .map(|i| i.status.as_str().len())
        .max()
        .unwrap_or(6)
        .max(6);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<id_width$}  {}  {:<status_width$}  {:<16}  {}\n",
        "ID", "P", "STATUS", "UPDATED", "TITLE"
    ));
    for issue in issues {
        let tags = if issue.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", issue.tags.join(", "))
        };
        out.push_str(&format!(
            "{:<id_width$}  {}  {:<status_width$}  {:<16}  {}{}\n",
            issue.id,
            issue.priority.0,
            colorize_status(&issue.status, status_width),
            format_ms(issue.updated_at),
            issue.title,
            tags.dimmed(),
        ));
    }
    out
}

/// Render one issue with comments and deps.
#[must_use]
pub fn issue_detail(issue: &Issue, comments: &[Comment], deps: &[Dep]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", issue.id.bold(), issue.title));
    out.push_str(&format!(
        "status: {}  priority: {}  created: {}  updated: {}\n",
        colorize_status(&issue.status, 0),
        issue.priority,
        format_ms(issue.created_at),
        format_ms(issue.updated_at),
    ));
    if !issue.tags.is_empty() {
        out.push_str(&format!("tags: {}\n", issue.tags.join(", ")));
    }
    if !issue.body.is_empty() {
        out.push('\n');
        out.push_str(&issue.body);
        out.push('\n');
    }

    if !deps.is_empty() {
        out.push_str(&format!("\n{}\n", "Dependencies".bold()));
        for dep in deps {
            out.push_str(&format!(
                "  {} {} {}\n",
                dep.src_id,
                dep.kind.as_str().cyan(),
                dep.dst_id
            ));
        }
    }

    if !comments.is_empty() {
        out.push_str(&format!("\n{}\n", "Comments".bold()));
        for comment in comments {
            out.push_str(&format!(
                "  {} {}\n",
                format_ms(comment.created_at).dimmed(),
                comment.body
            ));
        }
    }
    out
}

fn colorize_status(status: &Status, width: usize) -> String {
    let padded = format!("{:<width$}", status.as_str());
    match status {
        Status::Open => padded.green().to_string(),
        Status::InProgress => padded.yellow().to_string(),
        Status::Paused => padded.blue().to_string(),
        Status::Closed | Status::Duplicate => padded.dimmed().to_string(),
        Status::Custom(_) => padded,
    }
}
