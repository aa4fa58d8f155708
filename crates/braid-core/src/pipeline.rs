//! End-to-end board query.
//!
//! Wires the stages together:
//!
//! ```text
//! LocalTaskStore ─┐
//!                 ├─► BranchTaskScanner ─► resolve_locations ─┐
//! VCS provider ───┘          │                                ├─► ConflictResolver ─► assemble
//!                            └─► read_files + TaskDecoder ────┘
//! ```
//!
//! For each live task the local record (working-copy active file) is weighed
//! against the remote record read from the most recent *active* copy on any
//! branch. A copy that turns out unreadable or malformed is dropped from the
//! observations and the next freshest copy is tried, so the resolved
//! locations and the board always agree. Tasks whose current location is not active still get a resolved
//! task when a local record exists, so diagnostics can show what was hidden.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::alloc::next_id;
use crate::board::{Board, assemble};
use crate::config::ProjectConfig;
use crate::conflict::ConflictResolver;
use crate::error::CoreError;
use crate::model::{
    BranchRef, LocationKind, LocationObservation, ProvenanceRecord, ResolvedLocation,
    ResolvedTask, Source, TaskId, WORKING_COPY,
};
use crate::provider::{LocalSnapshot, LocalTaskStore, TaskDecoder, VersionControlProvider};
use crate::resolve::{latest, resolve_locations};
use crate::scan::{BranchTaskScanner, ScanOutcome, ScanWarning};

/// Everything a presentation layer needs from one query.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub board: Board,
    /// Resolved location of every task seen anywhere, ignoring copies that
    /// could not be read or decoded.
    pub locations: BTreeMap<TaskId, ResolvedLocation>,
    /// Resolved tasks in ID order, live or not.
    pub tasks: Vec<ResolvedTask>,
    pub warnings: Vec<ScanWarning>,
}

/// The injected collaborators of a query.
#[derive(Clone)]
pub struct Collaborators<'a> {
    pub provider: Arc<dyn VersionControlProvider>,
    pub store: &'a dyn LocalTaskStore,
    pub decoder: &'a dyn TaskDecoder,
}

/// Produce the board for the current state of every branch.
///
/// # Errors
///
/// Fails on an invalid config (including an unknown conflict strategy,
/// checked before any I/O), an unreadable working copy, or a panicking scan
/// worker. Version-control trouble only adds warnings.
pub async fn query_board(
    collaborators: Collaborators<'_>,
    config: &ProjectConfig,
    now: DateTime<Utc>,
) -> Result<BoardView, CoreError> {
    config.validate()?;
    let strategy = config.strategy()?;

    let local = LocalSnapshot::load(collaborators.store).map_err(CoreError::LocalStore)?;
    let scanner = BranchTaskScanner::new(collaborators.provider, config.scan.clone());
    let ScanOutcome {
        mut observations,
        mut warnings,
        branches,
    } = scanner.scan(&local, now).await?;

    // A copy that cannot be read or decoded is dropped and the task is
    // resolved again from the copies that remain.
    let mut remote_records = BTreeMap::new();
    let mut pending: Option<BTreeSet<TaskId>> = None;
    loop {
        let locations = resolve_locations(&observations);
        let targets = remote_targets(&observations, &branches, &locations, pending.as_ref());
        if targets.is_empty() {
            break;
        }
        let rejected = hydrate_remote(
            &scanner,
            collaborators.decoder,
            targets,
            &mut remote_records,
            &mut warnings,
        )
        .await?;
        if rejected.is_empty() {
            break;
        }
        pending = Some(rejected.iter().map(|copy| copy.task_id.clone()).collect());
        observations.retain(|observation| !rejected.contains(observation));
    }
    let locations = resolve_locations(&observations);

    let mut local_records: BTreeMap<TaskId, ProvenanceRecord> = BTreeMap::new();
    for stored in &local.active {
        local_records
            .entry(stored.record.id.clone())
            .or_insert_with(|| ProvenanceRecord {
                record: stored.record.clone(),
                source: Source::Local,
                origin_branch: WORKING_COPY.to_string(),
                last_modified: Some(stored.modified),
            });
    }

    let resolver = ConflictResolver::new(&config.statuses, strategy);
    let tasks: Vec<ResolvedTask> = locations
        .iter()
        .filter_map(|(task_id, location)| {
            let local = local_records.remove(task_id);
            let remote = remote_records.remove(task_id);
            resolver
                .resolve(local, remote)
                .map(|record| ResolvedTask {
                    record,
                    location: location.clone(),
                })
        })
        .collect();

    let board = assemble(&tasks, &config.statuses);
    info!(
        tasks = locations.len(),
        live = board.task_count(),
        warnings = warnings.len(),
        strategy = %strategy,
        "board resolved"
    );

    Ok(BoardView {
        board,
        locations,
        tasks,
        warnings,
    })
}

/// The freshest remote active copy of every live task, limited to `only`
/// when given.
fn remote_targets(
    observations: &[LocationObservation],
    branches: &[BranchRef],
    locations: &BTreeMap<TaskId, ResolvedLocation>,
    only: Option<&BTreeSet<TaskId>>,
) -> Vec<(BranchRef, LocationObservation)> {
    let mut remote_active: BTreeMap<&TaskId, Vec<&LocationObservation>> = BTreeMap::new();
    for observation in observations {
        if observation.source == Source::Remote
            && observation.kind == LocationKind::Active
            && only.is_none_or(|only| only.contains(&observation.task_id))
        {
            remote_active
                .entry(&observation.task_id)
                .or_default()
                .push(observation);
        }
    }

    remote_active
        .into_iter()
        .filter(|(task_id, _)| locations.get(*task_id).is_some_and(ResolvedLocation::is_live))
        .filter_map(|(_, copies)| latest(copies))
        .map(|observation| {
            let branch = branches
                .iter()
                .find(|branch| branch.name == observation.branch)
                .cloned()
                .unwrap_or_else(|| BranchRef::remote(observation.branch.clone()));
            (branch, observation.clone())
        })
        .collect()
}

/// Read and decode `targets` into `records`.
///
/// Returns the copies that could not be used, each already reported in
/// `warnings`.
async fn hydrate_remote(
    scanner: &BranchTaskScanner,
    decoder: &dyn TaskDecoder,
    targets: Vec<(BranchRef, LocationObservation)>,
    records: &mut BTreeMap<TaskId, ProvenanceRecord>,
    warnings: &mut Vec<ScanWarning>,
) -> Result<Vec<LocationObservation>, CoreError> {
    let mut rejected = Vec::new();
    for (observation, content) in scanner.read_files(targets).await? {
        let content = match content {
            Ok(content) => content,
            Err(err) => {
                warn!(branch = %observation.branch, path = %observation.path, error = %err, "cannot read remote task");
                warnings.push(ScanWarning::BranchUnreadable {
                    branch: observation.branch.clone(),
                    detail: format!("{}: {err}", observation.path),
                });
                rejected.push(observation);
                continue;
            }
        };

        match decoder.decode(&observation.path, &content) {
            Ok(record) if record.id == observation.task_id => {
                records.insert(
                    observation.task_id.clone(),
                    ProvenanceRecord {
                        record,
                        source: Source::Remote,
                        origin_branch: observation.branch.clone(),
                        last_modified: Some(observation.timestamp),
                    },
                );
            }
            Ok(record) => {
                warn!(branch = %observation.branch, path = %observation.path, "task id in file does not match file name");
                warnings.push(ScanWarning::MalformedTaskFile {
                    branch: observation.branch.clone(),
                    path: observation.path.clone(),
                    detail: format!(
                        "file name says {} but frontmatter says {}",
                        observation.task_id, record.id
                    ),
                });
                rejected.push(observation);
            }
            Err(err) => {
                warn!(branch = %observation.branch, path = %observation.path, error = %err, "skipping malformed task file");
                warnings.push(ScanWarning::MalformedTaskFile {
                    branch: observation.branch.clone(),
                    path: observation.path.clone(),
                    detail: err.reason,
                });
                rejected.push(observation);
            }
        }
    }
    Ok(rejected)
}

/// Where every copy of every task lives, without reading file contents.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub locations: BTreeMap<TaskId, ResolvedLocation>,
    /// Every copy seen, sorted by task ID then branch.
    pub observations: Vec<LocationObservation>,
    pub warnings: Vec<ScanWarning>,
}

/// Scan and resolve locations only.
///
/// # Errors
///
/// Fails when the working copy cannot be read or a scan worker panics.
pub async fn locate_tasks(
    provider: Arc<dyn VersionControlProvider>,
    store: &dyn LocalTaskStore,
    config: &ProjectConfig,
    now: DateTime<Utc>,
) -> Result<LocationReport, CoreError> {
    let local = LocalSnapshot::load(store).map_err(CoreError::LocalStore)?;
    let scanner = BranchTaskScanner::new(provider, config.scan.clone());
    let outcome = scanner.scan(&local, now).await?;
    Ok(LocationReport {
        locations: resolve_locations(&outcome.observations),
        observations: outcome.observations,
        warnings: outcome.warnings,
    })
}

/// Allocate the next task ID across the working copy and every branch.
///
/// # Errors
///
/// Fails when the working copy cannot be read or a scan worker panics.
/// Offline remotes only narrow the set of IDs considered; see
/// [`crate::alloc`] for why the result is advisory.
pub async fn allocate_id(
    provider: Arc<dyn VersionControlProvider>,
    store: &dyn LocalTaskStore,
    config: &ProjectConfig,
    parent: Option<&TaskId>,
    now: DateTime<Utc>,
) -> Result<(TaskId, Vec<ScanWarning>), CoreError> {
    let local = LocalSnapshot::load(store).map_err(CoreError::LocalStore)?;
    let scanner = BranchTaskScanner::new(provider, config.scan.clone());
    let outcome = scanner.scan(&local, now).await?;

    let tasks: Vec<_> = local.active.iter().map(|s| s.record.clone()).collect();
    let drafts: Vec<_> = local.drafts.iter().map(|s| s.record.clone()).collect();
    let id = next_id(&tasks, &drafts, &outcome.observations, parent)?;
    Ok((id, outcome.warnings))
}
