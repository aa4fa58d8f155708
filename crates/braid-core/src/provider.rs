//! Capabilities the engine consumes.
//!
//! The engine never talks to git or the filesystem directly. Callers hand in
//! a [`VersionControlProvider`] for branch data, a [`LocalTaskStore`] for the
//! working copy and a [`TaskDecoder`] for turning file contents into
//! [`TaskRecord`]s. Tests substitute in-memory fakes for all three.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;

use crate::error::ErrorCode;
use crate::model::{BranchRef, TaskRecord};

/// Failure of a provider or store call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The backend cannot be reached at all (offline, not a repository).
    #[error("version control unavailable: {0}")]
    Unavailable(String),

    /// A single command ran but reported failure.
    #[error("{operation} failed: {detail}")]
    CommandFailed { operation: String, detail: String },

    /// A command succeeded but its output could not be understood.
    #[error("unexpected output from {operation}: {detail}")]
    InvalidOutput { operation: String, detail: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProviderError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(_) => ErrorCode::VersionControlUnavailable,
            Self::CommandFailed { .. } | Self::InvalidOutput { .. } => ErrorCode::BranchUnreadable,
            Self::Io(_) => ErrorCode::LocalStoreUnreadable,
        }
    }
}

/// Failure to turn file contents into a [`TaskRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct DecodeError {
    pub path: String,
    pub reason: String,
}

impl DecodeError {
    #[must_use]
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedTaskFile
    }
}

/// Read-only access to the version-control backend.
///
/// Every method may suspend. Implementations must be cheap to share across
/// the scan worker pool.
#[async_trait]
pub trait VersionControlProvider: Send + Sync {
    /// Refresh remote-tracking branches. Failure is tolerated by callers.
    async fn fetch_remotes(&self) -> Result<(), ProviderError>;

    /// All local and remote-tracking branches known right now.
    async fn list_branches(&self) -> Result<Vec<BranchRef>, ProviderError>;

    /// Repository-relative paths of files under `prefix` on `branch`.
    ///
    /// A branch without that directory yields an empty list, not an error.
    async fn list_files(&self, branch: &BranchRef, prefix: &str)
    -> Result<Vec<String>, ProviderError>;

    /// Time of the last commit touching `path` on `branch`.
    async fn file_last_modified(
        &self,
        branch: &BranchRef,
        path: &str,
    ) -> Result<DateTime<Utc>, ProviderError>;

    /// Contents of `path` as of the tip of `branch`.
    async fn read_file(&self, branch: &BranchRef, path: &str) -> Result<String, ProviderError>;
}

/// A task file read from the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    pub record: TaskRecord,
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Commit time when the file is committed and clean, otherwise the
    /// on-disk modification time.
    pub modified: DateTime<Utc>,
}

/// One directory of the working copy: the tasks that decoded and the files
/// that were found but had to be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListing {
    pub tasks: Vec<StoredTask>,
    pub skipped: Vec<DecodeError>,
}

impl From<Vec<StoredTask>> for TaskListing {
    fn from(tasks: Vec<StoredTask>) -> Self {
        Self {
            tasks,
            skipped: Vec::new(),
        }
    }
}

/// Parsed task files of the working copy, grouped by location kind.
///
/// A single unreadable or undecodable file is reported in
/// [`TaskListing::skipped`]; only a directory that cannot be listed is an
/// error.
pub trait LocalTaskStore {
    /// # Errors
    ///
    /// Returns an error when the task directory exists but cannot be read.
    fn list_active_tasks(&self) -> Result<TaskListing, ProviderError>;

    /// # Errors
    ///
    /// Returns an error when the drafts directory exists but cannot be read.
    fn list_drafts(&self) -> Result<TaskListing, ProviderError>;

    /// Archived copies. Stores that do not track an archive return nothing.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive directory exists but cannot be read.
    fn list_archived(&self) -> Result<TaskListing, ProviderError> {
        Ok(TaskListing::default())
    }
}

/// Turns raw file contents into a task record.
pub trait TaskDecoder: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the content is not a valid task file.
    fn decode(&self, path: &str, content: &str) -> Result<TaskRecord, DecodeError>;
}

/// Snapshot of the working copy taken once per query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSnapshot {
    pub active: Vec<StoredTask>,
    pub drafts: Vec<StoredTask>,
    pub archived: Vec<StoredTask>,
    /// Files skipped across all three kinds, in listing order.
    pub skipped: Vec<DecodeError>,
}

impl LocalSnapshot {
    /// Read all three location kinds from `store`.
    ///
    /// # Errors
    ///
    /// Propagates the first store error.
    pub fn load(store: &dyn LocalTaskStore) -> Result<Self, ProviderError> {
        let mut snapshot = Self::default();
        let active = store.list_active_tasks()?;
        snapshot.active = active.tasks;
        snapshot.skipped.extend(active.skipped);
        let drafts = store.list_drafts()?;
        snapshot.drafts = drafts.tasks;
        snapshot.skipped.extend(drafts.skipped);
        let archived = store.list_archived()?;
        snapshot.archived = archived.tasks;
        snapshot.skipped.extend(archived.skipped);
        Ok(snapshot)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.drafts.is_empty() && self.archived.is_empty()
    }
}
