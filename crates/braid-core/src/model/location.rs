use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::{ProvenanceRecord, Source};
use super::task_id::TaskId;

/// Branch marker used for observations taken from the working copy.
pub const WORKING_COPY: &str = "(working copy)";

/// The three mutually exclusive places a task file can live.
///
/// The derived ordering is the tie-break preference used when two copies
/// share a timestamp: `Active > Draft > Archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Archived,
    Draft,
    Active,
}

impl LocationKind {
    /// Scan order for a branch; results are sorted afterwards, so this only
    /// affects the order of provider calls.
    pub const ALL: [Self; 3] = [Self::Active, Self::Draft, Self::Archived];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }

    /// Directory below the task root holding files of this kind.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Active => "tasks",
            Self::Draft => "drafts",
            Self::Archived => "archive/tasks",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Local,
    Remote,
}

/// A branch as enumerated by the version-control provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    /// Short name as accepted by the provider (`main`, `origin/feature-x`).
    pub name: String,
    pub kind: BranchKind,
    /// Checked out in the working copy.
    #[serde(default)]
    pub is_current: bool,
    /// Tip commit time, when the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<DateTime<Utc>>,
}

impl BranchRef {
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BranchKind::Local,
            is_current: false,
            last_commit: None,
        }
    }

    #[must_use]
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BranchKind::Remote,
            is_current: false,
            last_commit: None,
        }
    }

    #[must_use]
    pub fn with_last_commit(mut self, at: DateTime<Utc>) -> Self {
        self.last_commit = Some(at);
        self
    }

    #[must_use]
    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }

    /// Symbolic refs such as `origin/HEAD` alias another branch.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        self.name == "HEAD" || self.name.ends_with("/HEAD")
    }
}

/// One sighting of a task file on one branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationObservation {
    pub task_id: TaskId,
    /// Branch name, or [`WORKING_COPY`] for the local checkout.
    pub branch: String,
    pub source: Source,
    pub kind: LocationKind,
    /// Repository-relative path of the file.
    pub path: String,
    /// Last commit touching the file on that branch, or the working-copy
    /// modification time.
    pub timestamp: DateTime<Utc>,
}

/// The observation judged most current for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub winner: LocationObservation,
    /// How many copies of the task were seen in total.
    pub copies: usize,
}

impl ResolvedLocation {
    /// A task is live (shown on the board) only when its current copy is active.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.winner.kind == LocationKind::Active
    }

    #[must_use]
    pub fn kind(&self) -> LocationKind {
        self.winner.kind
    }
}

/// The record chosen for a task, paired with its resolved location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTask {
    pub record: ProvenanceRecord,
    pub location: ResolvedLocation,
}

impl ResolvedTask {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.location.is_live()
    }
}
