use std::fmt;

use crate::config::ConfigError;
use crate::model::TaskId;
use crate::provider::ProviderError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    UnknownConflictStrategy,
    InvalidConfigValue,
    InvalidTaskId,
    IdSpaceExhausted,
    VersionControlUnavailable,
    BranchUnreadable,
    MalformedTaskFile,
    LocalStoreUnreadable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::UnknownConflictStrategy => "E1003",
            Self::InvalidConfigValue => "E1004",
            Self::InvalidTaskId => "E2001",
            Self::IdSpaceExhausted => "E2002",
            Self::VersionControlUnavailable => "E4001",
            Self::BranchUnreadable => "E4002",
            Self::MalformedTaskFile => "E4003",
            Self::LocalStoreUnreadable => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::UnknownConflictStrategy => "Unknown conflict strategy",
            Self::InvalidConfigValue => "Invalid config value",
            Self::InvalidTaskId => "Invalid task ID",
            Self::IdSpaceExhausted => "No task ID left to allocate",
            Self::VersionControlUnavailable => "Version control unavailable",
            Self::BranchUnreadable => "Branch could not be read",
            Self::MalformedTaskFile => "Malformed task file",
            Self::LocalStoreUnreadable => "Local task store unreadable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .braid/config.toml and retry."),
            Self::UnknownConflictStrategy => {
                Some("Set conflict_strategy to `most_progressed` or `most_recent`.")
            }
            Self::InvalidConfigValue => Some("Check the values in .braid/config.toml."),
            Self::InvalidTaskId => Some("Task IDs look like `task-12` or `task-12.3`."),
            Self::IdSpaceExhausted => {
                Some("A task file carries the largest possible number. Rename it and retry.")
            }
            Self::VersionControlUnavailable => {
                Some("Showing local data only. Check network access and `git remote -v`.")
            }
            Self::BranchUnreadable => None,
            Self::MalformedTaskFile => Some("Fix the frontmatter of the listed task file."),
            Self::LocalStoreUnreadable => Some("Check read permissions on the task directories."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fatal errors of a resolution run.
///
/// Degraded conditions (offline remotes, unreadable branches, malformed
/// files) are reported as [`crate::scan::ScanWarning`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("local task store unreadable: {0}")]
    LocalStore(#[source] ProviderError),

    #[error("branch scan worker failed: {0}")]
    Worker(String),

    #[error("no ID can follow {after}")]
    IdSpaceExhausted { after: TaskId },
}

impl CoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(err) => err.code(),
            Self::LocalStore(_) => ErrorCode::LocalStoreUnreadable,
            Self::Worker(_) => ErrorCode::InternalUnexpected,
            Self::IdSpaceExhausted { .. } => ErrorCode::IdSpaceExhausted,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
