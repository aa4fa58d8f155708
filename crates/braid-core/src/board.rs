//! Board assembly: live tasks grouped by status.

use serde::{Deserialize, Serialize};

use crate::model::{ResolvedTask, TaskRecord};

/// One column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusGroup {
    pub status: String,
    /// `false` for statuses found in the data but missing from the config.
    pub configured: bool,
    pub tasks: Vec<TaskRecord>,
}

/// Ordered status groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub groups: Vec<StatusGroup>,
}

impl Board {
    #[must_use]
    pub fn group(&self, status: &str) -> Option<&StatusGroup> {
        self.groups.iter().find(|group| group.status == status)
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|group| group.tasks.len()).sum()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.groups.iter().flat_map(|group| group.tasks.iter())
    }
}

/// Build the board from resolved tasks.
///
/// Tasks whose current location is not active are dropped. Every status in
/// `status_order` gets a group, in that order, even when empty; statuses
/// missing from `status_order` follow in the order they were first seen.
/// Within a group the input order is kept. Status matching is exact.
#[must_use]
pub fn assemble(resolved: &[ResolvedTask], status_order: &[String]) -> Board {
    let mut groups: Vec<StatusGroup> = status_order
        .iter()
        .map(|status| StatusGroup {
            status: status.clone(),
            configured: true,
            tasks: Vec::new(),
        })
        .collect();

    for task in resolved.iter().filter(|task| task.is_live()) {
        let record = &task.record.record;
        let idx = match groups.iter().position(|group| group.status == record.status) {
            Some(idx) => idx,
            None => {
                groups.push(StatusGroup {
                    status: record.status.clone(),
                    configured: false,
                    tasks: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[idx].tasks.push(record.clone());
    }

    Board { groups }
}
