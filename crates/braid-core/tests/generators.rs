#![allow(dead_code)]

use braid_core::model::*;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use proptest::prelude::*;

pub const STATUSES: [&str; 4] = ["To Do", "In Progress", "Done", "Blocked"];

pub fn status_order() -> Vec<String> {
    STATUSES[..3].iter().map(|s| (*s).to_string()).collect()
}

/// Small ID space so that observations collide often.
pub fn arb_task_id() -> impl Strategy<Value = TaskId> + Clone {
    prop_oneof![
        (1u64..6).prop_map(TaskId::top_level),
        (1u64..4, 1u64..3).prop_map(|(root, child)| TaskId::top_level(root).child(child)),
    ]
}

/// Coarse timestamps so that ties happen.
pub fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> + Clone {
    (0i64..8).prop_map(|n| Utc.timestamp_opt(1_700_000_000 + n * 60, 0).unwrap())
}

pub fn arb_naive() -> impl Strategy<Value = NaiveDateTime> + Clone {
    arb_instant().prop_map(|t| t.naive_utc())
}

pub fn arb_kind() -> impl Strategy<Value = LocationKind> + Clone {
    prop_oneof![
        Just(LocationKind::Active),
        Just(LocationKind::Draft),
        Just(LocationKind::Archived),
    ]
}

pub fn arb_branch() -> impl Strategy<Value = (String, Source)> + Clone {
    prop_oneof![
        Just((WORKING_COPY.to_string(), Source::Local)),
        Just(("main".to_string(), Source::Remote)),
        Just(("origin/feature-a".to_string(), Source::Remote)),
        Just(("origin/feature-b".to_string(), Source::Remote)),
    ]
}

pub fn arb_observation() -> impl Strategy<Value = LocationObservation> + Clone {
    (arb_task_id(), arb_branch(), arb_kind(), arb_instant(), 0u8..2).prop_map(
        |(task_id, (branch, source), kind, timestamp, variant)| LocationObservation {
            path: format!("backlog/{}/{task_id} - t{variant}.md", kind.subdir()),
            task_id,
            branch,
            source,
            kind,
            timestamp,
        },
    )
}

pub fn arb_observations() -> impl Strategy<Value = Vec<LocationObservation>> + Clone {
    prop::collection::vec(arb_observation(), 0..40)
}

pub fn arb_record(id: TaskId) -> impl Strategy<Value = TaskRecord> + Clone {
    (
        prop::sample::select(STATUSES.to_vec()),
        arb_naive(),
        prop::option::of(arb_naive()),
        "[a-z]{1,8}",
    )
        .prop_map(move |(status, created, updated, title)| {
            let mut record = TaskRecord::new(id.clone(), title, status, created);
            record.updated_date = updated;
            record
        })
}

pub fn arb_provenance(source: Source) -> impl Strategy<Value = ProvenanceRecord> + Clone {
    (
        arb_record(TaskId::top_level(1)),
        prop::option::of(arb_instant()),
        prop::sample::select(vec!["main", "origin/feature-a"]),
    )
        .prop_map(move |(record, last_modified, branch)| ProvenanceRecord {
            record,
            source,
            origin_branch: match source {
                Source::Local => WORKING_COPY.to_string(),
                Source::Remote => branch.to_string(),
            },
            last_modified,
        })
}
