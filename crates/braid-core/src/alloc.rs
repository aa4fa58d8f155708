//! Next-ID allocation.
//!
//! Allocation looks at every ID visible locally and in any scanned branch
//! and picks one past the largest. It is advisory only: two people on two
//! unmerged branches can compute the same ID at the same time, and nothing
//! here prevents it. The duplicate surfaces as one task once both branches
//! are visible, and later scans allocate past both.

use crate::error::CoreError;
use crate::model::{LocationObservation, TaskId, TaskRecord};

/// Compute the next free ID.
///
/// Without `parent`, returns `task-<max+1>` where `max` is the largest
/// top-level number seen (subtasks count towards their root). With
/// `parent`, returns `<parent>.<max+1>` over the parent's direct children.
///
/// # Errors
///
/// Returns [`CoreError::IdSpaceExhausted`] when the largest number seen is
/// already `u64::MAX`.
pub fn next_id(
    local_tasks: &[TaskRecord],
    local_drafts: &[TaskRecord],
    observations: &[LocationObservation],
    parent: Option<&TaskId>,
) -> Result<TaskId, CoreError> {
    let universe = local_tasks
        .iter()
        .chain(local_drafts)
        .map(|task| &task.id)
        .chain(observations.iter().map(|observation| &observation.task_id));

    match parent {
        Some(parent) => {
            let max_child = universe
                .filter(|id| id.parent().as_ref() == Some(parent))
                .map(TaskId::ordinal)
                .max()
                .unwrap_or(0);
            max_child
                .checked_add(1)
                .map(|ordinal| parent.child(ordinal))
                .ok_or_else(|| CoreError::IdSpaceExhausted {
                    after: parent.child(max_child),
                })
        }
        None => {
            let max_root = universe.map(TaskId::root_number).max().unwrap_or(0);
            max_root
                .checked_add(1)
                .map(TaskId::top_level)
                .ok_or(CoreError::IdSpaceExhausted {
                    after: TaskId::top_level(max_root),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationKind, Source};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn tid(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn record(id: &str) -> TaskRecord {
        let created = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TaskRecord::new(tid(id), "t", "To Do", created)
    }

    fn seen(id: &str, branch: &str) -> LocationObservation {
        LocationObservation {
            task_id: tid(id),
            branch: branch.to_string(),
            source: Source::Remote,
            kind: LocationKind::Active,
            path: format!("backlog/tasks/{id} - t.md"),
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_universe_starts_at_one() {
        assert_eq!(next_id(&[], &[], &[], None).unwrap(), tid("task-1"));
        assert_eq!(next_id(&[], &[], &[], Some(&tid("task-4"))).unwrap(), tid("task-4.1"));
    }

    #[test]
    fn counts_local_and_branch_ids() {
        let tasks = [record("task-1")];
        let drafts = [record("task-2")];
        let observed = [seen("task-2.1", "origin/feature")];
        assert_eq!(next_id(&tasks, &drafts, &observed, None).unwrap(), tid("task-3"));
        assert_eq!(
            next_id(&tasks, &drafts, &observed, Some(&tid("task-2"))).unwrap(),
            tid("task-2.2")
        );
    }

    #[test]
    fn remote_only_ids_are_respected() {
        let tasks = [record("task-3")];
        let observed = [seen("task-11", "origin/other")];
        assert_eq!(next_id(&tasks, &[], &observed, None).unwrap(), tid("task-12"));
    }

    #[test]
    fn subtask_roots_raise_the_top_level_max() {
        let observed = [seen("task-7.2", "origin/x")];
        assert_eq!(next_id(&[], &[], &observed, None).unwrap(), tid("task-8"));
    }

    #[test]
    fn grandchildren_do_not_count_as_children() {
        let tasks = [record("task-2.1"), record("task-2.1.5")];
        assert_eq!(next_id(&tasks, &[], &[], Some(&tid("task-2"))).unwrap(), tid("task-2.2"));
        assert_eq!(
            next_id(&tasks, &[], &[], Some(&tid("task-2.1"))).unwrap(),
            tid("task-2.1.6")
        );
    }

    #[test]
    fn largest_number_cannot_be_followed() {
        let observed = [seen("task-18446744073709551615", "origin/x")];
        let err = next_id(&[], &[], &observed, None).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::IdSpaceExhausted);
        assert!(err.to_string().contains("task-18446744073709551615"));

        let tasks = [record("task-3.18446744073709551615")];
        let err = next_id(&tasks, &[], &[], Some(&tid("task-3"))).unwrap_err();
        assert!(matches!(err, CoreError::IdSpaceExhausted { .. }));
        assert_eq!(next_id(&tasks, &[], &[], None).unwrap(), tid("task-4"));
    }
}
