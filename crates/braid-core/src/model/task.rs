use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use super::task_id::TaskId;

/// Optional task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid priority `{0}` (expected high, medium or low)")]
pub struct InvalidPriority(pub String);

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }
}

/// One parsed task file.
///
/// Sets are ordered so that two records with the same content compare equal
/// regardless of the order fields were written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub assignee: BTreeSet<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    #[serde(default)]
    pub description: String,
    pub created_date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,
}

impl TaskRecord {
    /// Minimal record with empty collections; handy for tests and decoders.
    #[must_use]
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        status: impl Into<String>,
        created_date: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            status: status.into(),
            assignee: BTreeSet::new(),
            labels: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            description: String::new(),
            created_date,
            updated_date: None,
            priority: None,
            parent_task_id: None,
        }
    }
}

/// Where a full record was read from.
///
/// `Local` is the working copy. Everything read out of a git ref, including
/// local branches that are not checked out, is `Remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remote,
    Local,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`TaskRecord`] together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub record: TaskRecord,
    pub source: Source,
    pub origin_branch: String,
    /// Commit time (remote) or on-disk modification time (local) of the file
    /// the record was read from. Used when `updated_date` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ProvenanceRecord {
    /// The timestamp conflict selection compares: `updated_date` when set,
    /// otherwise the file's last-modified time.
    #[must_use]
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.record
            .updated_date
            .map(|date| date.and_utc())
            .or(self.last_modified)
    }
}
