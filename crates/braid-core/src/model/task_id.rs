//! Task identifiers.
//!
//! IDs are `task-<n>` for top-level tasks and `task-<n>.<m>...` for
//! subtasks. Parsing is case-insensitive on the prefix and accepts a bare
//! numeric form (`12`, `12.3`); the canonical rendering is always lowercase
//! `task-` followed by the dotted segments.
//!
//! Ordering is numeric per segment, so `task-2 < task-2.1 < task-10`.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ErrorCode;

const PREFIX: &str = "task-";

/// Parsed, normalized task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId {
    segments: Vec<u64>,
}

/// Raised when a string is not a valid task identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task id `{raw}`")]
pub struct InvalidTaskId {
    pub raw: String,
}

impl InvalidTaskId {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidTaskId
    }
}

impl TaskId {
    /// Build a top-level ID from its number.
    #[must_use]
    pub fn top_level(number: u64) -> Self {
        Self {
            segments: vec![number],
        }
    }

    /// Numeric segments, outermost first. Never empty.
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// The number of the top-level ancestor (`task-4.2.1` → 4).
    #[must_use]
    pub fn root_number(&self) -> u64 {
        self.segments[0]
    }

    /// The last segment (`task-4.2` → 2).
    #[must_use]
    pub fn ordinal(&self) -> u64 {
        self.segments[self.segments.len() - 1]
    }

    #[must_use]
    pub fn is_subtask(&self) -> bool {
        self.segments.len() > 1
    }

    /// Direct parent, if this is a subtask.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_subtask() {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }

    /// Direct child with the given ordinal.
    #[must_use]
    pub fn child(&self, ordinal: u64) -> Self {
        let mut segments = self.segments.clone();
        segments.push(ordinal);
        Self { segments }
    }
}

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTaskId { raw: s.to_string() };

        let trimmed = s.trim();
        let body = match trimmed.get(..PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(PREFIX) => &trimmed[PREFIX.len()..],
            _ => trimmed,
        };
        if body.is_empty() {
            return Err(invalid());
        }

        let segments = body
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

impl TryFrom<String> for TaskId {
    type Error = InvalidTaskId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PREFIX)?;
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Extract the task ID and title from a task file name.
///
/// The accepted shape is `task-<id> - <title>.md`. Anything else (including
/// a directory component) yields `None` and is ignored by callers.
#[must_use]
pub fn parse_task_file_name(file_name: &str) -> Option<(TaskId, String)> {
    let stem = file_name.strip_suffix(".md")?;
    let (id_part, title) = stem.split_once(" - ")?;
    if !id_part
        .get(..PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX))
    {
        return None;
    }
    let id = id_part.parse().ok()?;
    Some((id, title.trim().to_string()))
}

/// Extract the task ID from the last component of a slash-separated path.
#[must_use]
pub fn task_id_from_path(path: &str) -> Option<TaskId> {
    let file_name = path.rsplit('/').next()?;
    parse_task_file_name(file_name).map(|(id, _)| id)
}
