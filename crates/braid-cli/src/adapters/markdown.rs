//! Markdown task files with YAML frontmatter.
//!
//! ```text
//! ---
//! id: task-12
//! title: Fix login timeout
//! status: In Progress
//! assignee: ["@alice"]
//! created_date: '2025-06-01 09:30'
//! updated_date: '2025-06-03'
//! labels: [auth]
//! dependencies: [task-9]
//! priority: high
//! ---
//!
//! Description body.
//! ```
//!
//! `id` and `title` fall back to the file name when absent. `assignee` may be
//! a single string or a list.

use braid_core::model::{Priority, TaskId, TaskRecord, parse_task_file_name};
use braid_core::provider::{DecodeError, TaskDecoder};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::One(value) => [value].into_iter().filter(|v| !v.is_empty()).collect(),
            Self::Many(values) => values.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    status: String,
    #[serde(default)]
    assignee: Option<OneOrMany>,
    #[serde(default)]
    labels: Option<Vec<String>>,
    #[serde(default)]
    dependencies: Option<Vec<String>>,
    created_date: String,
    #[serde(default)]
    updated_date: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, alias = "parent")]
    parent_task_id: Option<String>,
}

/// Decoder for the on-disk task format.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownDecoder;

impl TaskDecoder for MarkdownDecoder {
    fn decode(&self, path: &str, content: &str) -> Result<TaskRecord, DecodeError> {
        let normalized = content.replace("\r\n", "\n");
        let (frontmatter, body) = split_frontmatter(&normalized)
            .ok_or_else(|| DecodeError::new(path, "missing `---` frontmatter block"))?;
        let fm: Frontmatter = serde_yaml::from_str(frontmatter)
            .map_err(|e| DecodeError::new(path, format!("invalid frontmatter: {e}")))?;

        let from_name = path
            .rsplit('/')
            .next()
            .and_then(parse_task_file_name);

        let id = match (&fm.id, &from_name) {
            (Some(raw), _) => parse_id(path, raw)?,
            (None, Some((id, _))) => id.clone(),
            (None, None) => return Err(DecodeError::new(path, "no task id in frontmatter or file name")),
        };
        let title = fm
            .title
            .or_else(|| from_name.map(|(_, title)| title))
            .unwrap_or_default();

        let mut record = TaskRecord::new(id, title, fm.status, parse_date(path, &fm.created_date)?);
        record.assignee = fm.assignee.map(OneOrMany::into_set).unwrap_or_default();
        record.labels = fm.labels.unwrap_or_default().into_iter().collect();
        record.dependencies = fm
            .dependencies
            .unwrap_or_default()
            .iter()
            .map(|raw| parse_id(path, raw))
            .collect::<Result<_, _>>()?;
        record.description = body.trim().to_string();
        record.updated_date = fm
            .updated_date
            .as_deref()
            .map(|raw| parse_date(path, raw))
            .transpose()?;
        record.priority = fm
            .priority
            .as_deref()
            .map(|raw| raw.parse::<Priority>())
            .transpose()
            .map_err(|e| DecodeError::new(path, e.to_string()))?;
        record.parent_task_id = fm
            .parent_task_id
            .as_deref()
            .map(|raw| parse_id(path, raw))
            .transpose()?;
        Ok(record)
    }
}

fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.trim_start_matches('\u{feff}').strip_prefix("---\n")?;
    if let Some(body) = rest.strip_prefix("---") {
        return Some(("", body.strip_prefix('\n').unwrap_or(body)));
    }
    let end = rest.find("\n---")?;
    let after = &rest[end + 4..];
    let body = after.split_once('\n').map_or("", |(_, body)| body);
    Some((&rest[..end], body))
}

fn parse_id(path: &str, raw: &str) -> Result<TaskId, DecodeError> {
    raw.parse::<TaskId>()
        .map_err(|e| DecodeError::new(path, e.to_string()))
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD HH:MM:SS`.
fn parse_date(path: &str, raw: &str) -> Result<NaiveDateTime, DecodeError> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| DecodeError::new(path, format!("unrecognized date `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "backlog/tasks/task-12 - Fix login.md";

    #[test]
    fn decodes_full_frontmatter() {
        let content = "---\n\
id: task-12\n\
title: Fix login timeout\n\
status: In Progress\n\
assignee: ['@alice', '@bob']\n\
created_date: '2025-06-01 09:30'\n\
updated_date: '2025-06-03'\n\
labels: [auth, backend]\n\
dependencies: [task-9, task-10.1]\n\
priority: High\n\
parent_task_id: task-3\n\
---\n\
\n\
## Description\n\
Sessions expire too early.\n";
        let record = MarkdownDecoder.decode(PATH, content).unwrap();

        assert_eq!(record.id.to_string(), "task-12");
        assert_eq!(record.title, "Fix login timeout");
        assert_eq!(record.status, "In Progress");
        assert_eq!(record.assignee.len(), 2);
        assert!(record.labels.contains("backend"));
        assert_eq!(record.dependencies.len(), 2);
        assert_eq!(record.priority, Some(Priority::High));
        assert_eq!(record.parent_task_id.unwrap().to_string(), "task-3");
        assert_eq!(record.created_date.to_string(), "2025-06-01 09:30:00");
        assert_eq!(record.updated_date.unwrap().to_string(), "2025-06-03 00:00:00");
        assert_eq!(record.description, "## Description\nSessions expire too early.");
    }

    #[test]
    fn id_and_title_fall_back_to_file_name() {
        let content = "---\nstatus: To Do\ncreated_date: 2025-06-01\nassignee: '@carol'\n---\n";
        let record = MarkdownDecoder.decode(PATH, content).unwrap();
        assert_eq!(record.id.to_string(), "task-12");
        assert_eq!(record.title, "Fix login");
        assert_eq!(record.assignee.iter().next().map(String::as_str), Some("@carol"));
        assert!(record.updated_date.is_none());
        assert!(record.description.is_empty());
    }

    #[test]
    fn crlf_files_decode() {
        let content = "---\r\nid: task-1\r\nstatus: Done\r\ncreated_date: 2025-01-02\r\n---\r\nbody\r\n";
        let record = MarkdownDecoder.decode("x.md", content).unwrap();
        assert_eq!(record.status, "Done");
        assert_eq!(record.description, "body");
    }

    #[test]
    fn missing_frontmatter_is_rejected() {
        let err = MarkdownDecoder.decode(PATH, "# just a heading\n").unwrap_err();
        assert!(err.reason.contains("frontmatter"));
        assert_eq!(err.path, PATH);
    }

    #[test]
    fn missing_status_is_rejected() {
        let err = MarkdownDecoder
            .decode(PATH, "---\nid: task-12\ncreated_date: 2025-06-01\n---\n")
            .unwrap_err();
        assert!(err.reason.contains("status"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let bad_date = "---\nstatus: To Do\ncreated_date: yesterday\n---\n";
        assert!(MarkdownDecoder.decode(PATH, bad_date).is_err());

        let bad_priority = "---\nstatus: To Do\ncreated_date: 2025-06-01\npriority: urgent\n---\n";
        assert!(MarkdownDecoder.decode(PATH, bad_priority).is_err());

        let bad_dep = "---\nstatus: To Do\ncreated_date: 2025-06-01\ndependencies: [later]\n---\n";
        assert!(MarkdownDecoder.decode(PATH, bad_dep).is_err());
    }

    #[test]
    fn no_id_anywhere_is_rejected() {
        let content = "---\nstatus: To Do\ncreated_date: 2025-06-01\n---\n";
        let err = MarkdownDecoder.decode("notes/readme.md", content).unwrap_err();
        assert!(err.reason.contains("no task id"));
    }
}
