//! Latest-location resolution.
//!
//! Reduces every observation of a task to the single copy judged current.
//!
//! # Precedence
//!
//! Between two observations of the same task, the winner is decided by the
//! first step that distinguishes them:
//!
//! 1. **Timestamp**: later wins.
//! 2. **Location kind**: `active` beats `draft` beats `archived`, so a
//!    coincident archive never hides active work.
//! 3. **Source**: the working copy beats any branch.
//! 4. **Branch name**: lexicographically smaller wins.
//! 5. **Path**: lexicographically smaller wins.
//!
//! Steps 4 and 5 only exist so the result does not depend on input order.
//! Together the chain is a total order over distinct observations, which
//! makes resolution a pure function of the observation set.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{LocationObservation, ResolvedLocation, TaskId};

/// `Greater` when `a` takes precedence over `b`.
#[must_use]
pub fn precedence(a: &LocationObservation, b: &LocationObservation) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| b.branch.cmp(&a.branch))
        .then_with(|| b.path.cmp(&a.path))
}

/// The observation with the highest precedence, if any.
pub fn latest<'a, I>(observations: I) -> Option<&'a LocationObservation>
where
    I: IntoIterator<Item = &'a LocationObservation>,
{
    observations
        .into_iter()
        .max_by(|a, b| precedence(a, b))
}

/// Resolve every task seen in `observations` to its current location.
///
/// Every task ID present in the input has exactly one entry in the output;
/// IDs with no observations are absent.
#[must_use]
pub fn resolve_locations(
    observations: &[LocationObservation],
) -> BTreeMap<TaskId, ResolvedLocation> {
    let mut grouped: BTreeMap<&TaskId, Vec<&LocationObservation>> = BTreeMap::new();
    for observation in observations {
        grouped
            .entry(&observation.task_id)
            .or_default()
            .push(observation);
    }

    grouped
        .into_iter()
        .filter_map(|(task_id, copies)| {
            let count = copies.len();
            latest(copies).map(|winner| {
                (
                    task_id.clone(),
                    ResolvedLocation {
                        winner: winner.clone(),
                        copies: count,
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationKind, Source, WORKING_COPY};
    use chrono::{TimeZone, Utc};

    fn tid(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn obs(id: &str, branch: &str, kind: LocationKind, ts: i64) -> LocationObservation {
        let source = if branch == WORKING_COPY {
            Source::Local
        } else {
            Source::Remote
        };
        LocationObservation {
            task_id: id.parse().unwrap(),
            branch: branch.to_string(),
            source,
            kind,
            path: format!("backlog/{}/{id} - T.md", kind.subdir()),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[test]
    fn latest_timestamp_wins() {
        let input = vec![
            obs("task-1", "origin/a", LocationKind::Active, 100),
            obs("task-1", "origin/b", LocationKind::Archived, 200),
        ];
        let resolved = resolve_locations(&input);
        let loc = &resolved[&tid("task-1")];
        assert_eq!(loc.kind(), LocationKind::Archived);
        assert!(!loc.is_live());
        assert_eq!(loc.copies, 2);
    }

    #[test]
    fn equal_timestamps_prefer_active_over_archived() {
        let input = vec![
            obs("task-1", "origin/a", LocationKind::Archived, 100),
            obs("task-1", "origin/b", LocationKind::Active, 100),
        ];
        let resolved = resolve_locations(&input);
        assert_eq!(resolved[&tid("task-1")].kind(), LocationKind::Active);
    }

    #[test]
    fn equal_timestamps_prefer_draft_over_archived() {
        let input = vec![
            obs("task-1", "origin/a", LocationKind::Draft, 100),
            obs("task-1", "origin/b", LocationKind::Archived, 100),
        ];
        let resolved = resolve_locations(&input);
        assert_eq!(resolved[&tid("task-1")].kind(), LocationKind::Draft);
    }

    #[test]
    fn equal_timestamp_and_kind_prefer_working_copy() {
        let input = vec![
            obs("task-1", "origin/a", LocationKind::Active, 100),
            obs("task-1", WORKING_COPY, LocationKind::Active, 100),
        ];
        let resolved = resolve_locations(&input);
        let winner = &resolved[&tid("task-1")].winner;
        assert_eq!(winner.source, Source::Local);
    }

    #[test]
    fn full_tie_is_broken_by_branch_name() {
        let a = obs("task-1", "origin/a", LocationKind::Active, 100);
        let b = obs("task-1", "origin/b", LocationKind::Active, 100);
        let forward = resolve_locations(&[a.clone(), b.clone()]);
        let backward = resolve_locations(&[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward[&tid("task-1")].winner.branch, "origin/a");
    }

    #[test]
    fn every_id_resolves_exactly_once() {
        let input = vec![
            obs("task-1", "origin/a", LocationKind::Active, 1),
            obs("task-2", "origin/a", LocationKind::Draft, 1),
            obs("task-2.1", WORKING_COPY, LocationKind::Active, 5),
            obs("task-1", "origin/b", LocationKind::Active, 3),
        ];
        let resolved = resolve_locations(&input);
        let ids: Vec<String> = resolved.keys().map(ToString::to_string).collect();
        assert_eq!(ids, ["task-1", "task-2", "task-2.1"]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(resolve_locations(&[]).is_empty());
    }
}
