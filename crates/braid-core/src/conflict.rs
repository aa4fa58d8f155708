//! Whole-record conflict selection.
//!
//! When the working copy and another branch both hold an active copy of the
//! same task and the two differ, exactly one of them is kept. The output is
//! always one of the inputs; fields are never combined, so an edit made only
//! on the losing side is dropped.
//!
//! # Strategies
//!
//! - `most_progressed`: higher position in the status list wins. Statuses not
//!   in the list rank below every listed one. Equal rank falls through to the
//!   `most_recent` comparison.
//! - `most_recent`: later `updated_date` wins, with the file's last-modified
//!   time standing in when `updated_date` is absent. A record with no time at
//!   all is older than any record with one.
//!
//! A full tie keeps the local record.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::{fmt, str::FromStr};

use crate::config::ConfigError;
use crate::model::ProvenanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    MostProgressed,
    MostRecent,
}

impl ConflictStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MostProgressed => "most_progressed",
            Self::MostRecent => "most_recent",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "most_progressed" => Ok(Self::MostProgressed),
            "most_recent" => Ok(Self::MostRecent),
            other => Err(ConfigError::UnknownConflictStrategy(other.to_string())),
        }
    }
}

/// Position of `status` in `status_order`; `None` ranks below every `Some`.
#[must_use]
pub fn status_rank(status: &str, status_order: &[String]) -> Option<usize> {
    status_order.iter().position(|candidate| candidate == status)
}

/// Picks one record when local and remote copies of a task disagree.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver<'a> {
    status_order: &'a [String],
    strategy: ConflictStrategy,
}

impl<'a> ConflictResolver<'a> {
    #[must_use]
    pub const fn new(status_order: &'a [String], strategy: ConflictStrategy) -> Self {
        Self {
            status_order,
            strategy,
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Choose between the two sides. A missing side is simply absent; with
    /// both absent there is nothing to return.
    #[must_use]
    pub fn resolve(
        &self,
        local: Option<ProvenanceRecord>,
        remote: Option<ProvenanceRecord>,
    ) -> Option<ProvenanceRecord> {
        match (local, remote) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => Some(only),
            (Some(local), Some(remote)) => {
                if local.record == remote.record {
                    return Some(local);
                }
                if self.compare(&remote, &local) == Ordering::Greater {
                    Some(remote)
                } else {
                    Some(local)
                }
            }
        }
    }

    /// `Greater` when `a` should win over `b`.
    fn compare(&self, a: &ProvenanceRecord, b: &ProvenanceRecord) -> Ordering {
        let by_time = || a.effective_time().cmp(&b.effective_time());
        match self.strategy {
            ConflictStrategy::MostProgressed => {
                let rank_a = status_rank(&a.record.status, self.status_order);
                let rank_b = status_rank(&b.record.status, self.status_order);
                rank_a.cmp(&rank_b).then_with(by_time)
            }
            ConflictStrategy::MostRecent => by_time(),
        }
    }
}
