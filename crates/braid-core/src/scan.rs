//! Cross-branch task discovery.
//!
//! [`BranchTaskScanner`] turns a [`VersionControlProvider`] plus a snapshot
//! of the working copy into a flat list of [`LocationObservation`]s: one per
//! physical copy of a task file, on every branch, in every location kind.
//!
//! # Pipeline
//!
//! 1. `fetch_remotes()` is attempted. Failure is recorded as a warning and
//!    the scan continues with whatever branches are already known.
//! 2. Branches are listed and filtered (symbolic refs, the checked-out
//!    branch, disabled branch kinds and stale branches are dropped).
//! 3. Each remaining branch is scanned by a worker from a fixed-size pool.
//!    A worker lists the three task directories and asks for the last commit
//!    time of every file whose name matches `task-<id> - <title>.md`, a few
//!    lookups at a time.
//! 4. Working-copy observations are added (files the store skipped become
//!    warnings) and the combined list is sorted, so the output does not
//!    depend on which worker finished first.
//!
//! Nothing in the scan is fatal except a worker panicking. Offline remotes,
//! unreadable branches and missing directories all degrade to fewer
//! observations.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

use crate::config::ScanConfig;
use crate::error::{CoreError, ErrorCode};
use crate::model::{
    BranchKind, BranchRef, LocationKind, LocationObservation, Source, TaskId, WORKING_COPY,
    task_id_from_path,
};
use crate::provider::{LocalSnapshot, ProviderError, StoredTask, VersionControlProvider};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// A recoverable problem met while gathering data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// Fetching or listing branches failed; results lean on local data.
    VersionControlUnavailable { detail: String },
    /// One branch (or one directory/file on it) could not be read.
    BranchUnreadable { branch: String, detail: String },
    /// A task file was found but could not be decoded.
    MalformedTaskFile {
        branch: String,
        path: String,
        detail: String,
    },
}

impl ScanWarning {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::VersionControlUnavailable { .. } => ErrorCode::VersionControlUnavailable,
            Self::BranchUnreadable { .. } => ErrorCode::BranchUnreadable,
            Self::MalformedTaskFile { .. } => ErrorCode::MalformedTaskFile,
        }
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionControlUnavailable { detail } => {
                write!(f, "{}: {detail}", self.code().message())
            }
            Self::BranchUnreadable { branch, detail } => {
                write!(f, "{} ({branch}): {detail}", self.code().message())
            }
            Self::MalformedTaskFile {
                branch,
                path,
                detail,
            } => write!(f, "{} ({branch}:{path}): {detail}", self.code().message()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Sorted by `(task_id, branch, kind, path)`.
    pub observations: Vec<LocationObservation>,
    pub warnings: Vec<ScanWarning>,
    /// Branches that were scanned, sorted by name.
    pub branches: Vec<BranchRef>,
}

impl ScanOutcome {
    #[must_use]
    pub fn branch(&self, name: &str) -> Option<&BranchRef> {
        self.branches.iter().find(|branch| branch.name == name)
    }
}

#[derive(Debug, Default)]
struct BranchScan {
    observations: Vec<LocationObservation>,
    warnings: Vec<ScanWarning>,
}

/// Walks every branch for task files with bounded parallelism.
#[derive(Clone)]
pub struct BranchTaskScanner {
    provider: Arc<dyn VersionControlProvider>,
    config: ScanConfig,
}

impl fmt::Debug for BranchTaskScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchTaskScanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BranchTaskScanner {
    #[must_use]
    pub fn new(provider: Arc<dyn VersionControlProvider>, config: ScanConfig) -> Self {
        Self { provider, config }
    }

    /// Gather observations from every branch and from `local`.
    ///
    /// `now` is only used for the stale-branch filter.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Worker`] if a scan worker panics. Provider
    /// failures never surface as errors; they become warnings.
    pub async fn scan(
        &self,
        local: &LocalSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, CoreError> {
        let mut warnings = local_warnings(local);
        let branches = self.discover_branches(now, &mut warnings).await;

        let dirs: Vec<(LocationKind, String)> = LocationKind::ALL
            .into_iter()
            .map(|kind| (kind, self.config.dir_for(kind)))
            .collect();

        let provider = Arc::clone(&self.provider);
        let scans = run_bounded(
            self.config.effective_concurrency(),
            branches.clone(),
            move |branch| scan_branch(Arc::clone(&provider), branch, dirs.clone()),
        )
        .await?;

        let mut observations = local_observations(local);
        for scan in scans {
            let scan = scan?;
            observations.extend(scan.observations);
            warnings.extend(scan.warnings);
        }
        observations.sort_by(|a, b| {
            a.task_id
                .cmp(&b.task_id)
                .then_with(|| a.branch.cmp(&b.branch))
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.path.cmp(&b.path))
        });

        info!(
            branches = branches.len(),
            observations = observations.len(),
            warnings = warnings.len(),
            "branch scan complete"
        );

        Ok(ScanOutcome {
            observations,
            warnings,
            branches,
        })
    }

    /// Read the contents of each target file, with the same bounded pool.
    ///
    /// Results keep the order of `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Worker`] if a read worker panics.
    pub async fn read_files(
        &self,
        targets: Vec<(BranchRef, LocationObservation)>,
    ) -> Result<Vec<(LocationObservation, Result<String, ProviderError>)>, CoreError> {
        let provider = Arc::clone(&self.provider);
        run_bounded(
            self.config.effective_concurrency(),
            targets,
            move |(branch, observation)| {
                let provider = Arc::clone(&provider);
                async move {
                    let content = provider.read_file(&branch, &observation.path).await;
                    (observation, content)
                }
            },
        )
        .await
    }

    async fn discover_branches(
        &self,
        now: DateTime<Utc>,
        warnings: &mut Vec<ScanWarning>,
    ) -> Vec<BranchRef> {
        if self.config.remote_operations {
            if let Err(err) = self.provider.fetch_remotes().await {
                warn!(error = %err, "fetch failed, continuing with known branches");
                warnings.push(ScanWarning::VersionControlUnavailable {
                    detail: format!("fetch: {err}"),
                });
            }
        }

        let listed = match self.provider.list_branches().await {
            Ok(branches) => branches,
            Err(err) => {
                warn!(error = %err, "branch listing failed, using working copy only");
                warnings.push(ScanWarning::VersionControlUnavailable {
                    detail: format!("list branches: {err}"),
                });
                return Vec::new();
            }
        };

        let mut by_name: BTreeMap<String, BranchRef> = BTreeMap::new();
        for branch in listed {
            if self.keep_branch(&branch, now) {
                by_name.entry(branch.name.clone()).or_insert(branch);
            } else {
                trace!(branch = %branch.name, "skipping branch");
            }
        }
        by_name.into_values().collect()
    }

    fn keep_branch(&self, branch: &BranchRef, now: DateTime<Utc>) -> bool {
        if branch.is_symbolic() || branch.is_current {
            return false;
        }
        let kind_enabled = match branch.kind {
            BranchKind::Remote => self.config.remote_operations,
            BranchKind::Local => self.config.check_local_branches,
        };
        if !kind_enabled {
            return false;
        }
        if self.config.active_branch_days == 0 {
            return true;
        }
        let horizon = Duration::days(i64::from(self.config.active_branch_days));
        branch
            .last_commit
            .is_none_or(|last_commit| now - last_commit <= horizon)
    }
}

/// Commit-time lookups in flight inside one branch worker.
const TIMESTAMP_LOOKUPS_PER_BRANCH: usize = 4;

async fn scan_branch(
    provider: Arc<dyn VersionControlProvider>,
    branch: BranchRef,
    dirs: Vec<(LocationKind, String)>,
) -> Result<BranchScan, CoreError> {
    let mut scan = BranchScan::default();
    let mut candidates: Vec<(LocationKind, String, TaskId)> = Vec::new();

    for (kind, dir) in dirs {
        let files = match provider.list_files(&branch, &dir).await {
            Ok(files) => files,
            Err(err) => {
                warn!(branch = %branch.name, dir = %dir, error = %err, "cannot list task directory");
                scan.warnings.push(ScanWarning::BranchUnreadable {
                    branch: branch.name.clone(),
                    detail: format!("{dir}: {err}"),
                });
                continue;
            }
        };

        let prefix = format!("{dir}/");
        for path in files {
            let direct_child = path
                .strip_prefix(&prefix)
                .is_some_and(|rest| !rest.contains('/'));
            match direct_child.then(|| task_id_from_path(&path)).flatten() {
                Some(task_id) => candidates.push((kind, path, task_id)),
                None => trace!(branch = %branch.name, path = %path, "ignoring non-task file"),
            }
        }
    }

    let lookup_provider = Arc::clone(&provider);
    let lookup_branch = branch.clone();
    let lookups = run_bounded(
        TIMESTAMP_LOOKUPS_PER_BRANCH,
        candidates,
        move |(kind, path, task_id)| {
            let provider = Arc::clone(&lookup_provider);
            let branch = lookup_branch.clone();
            async move {
                let timestamp = provider.file_last_modified(&branch, &path).await;
                (kind, path, task_id, timestamp)
            }
        },
    )
    .await?;

    for (kind, path, task_id, timestamp) in lookups {
        match timestamp {
            Ok(timestamp) => scan.observations.push(LocationObservation {
                task_id,
                branch: branch.name.clone(),
                source: Source::Remote,
                kind,
                path,
                timestamp,
            }),
            Err(err) => {
                warn!(branch = %branch.name, path = %path, error = %err, "no commit time for task file");
                scan.warnings.push(ScanWarning::BranchUnreadable {
                    branch: branch.name.clone(),
                    detail: format!("{path}: {err}"),
                });
            }
        }
    }

    debug!(
        branch = %branch.name,
        observations = scan.observations.len(),
        "branch scanned"
    );
    Ok(scan)
}

/// Working-copy files the store had to skip.
fn local_warnings(local: &LocalSnapshot) -> Vec<ScanWarning> {
    local
        .skipped
        .iter()
        .map(|skipped| ScanWarning::MalformedTaskFile {
            branch: WORKING_COPY.to_string(),
            path: skipped.path.clone(),
            detail: skipped.reason.clone(),
        })
        .collect()
}

fn local_observations(local: &LocalSnapshot) -> Vec<LocationObservation> {
    let groups: [(LocationKind, &[StoredTask]); 3] = [
        (LocationKind::Active, &local.active),
        (LocationKind::Draft, &local.drafts),
        (LocationKind::Archived, &local.archived),
    ];

    groups
        .into_iter()
        .flat_map(|(kind, tasks)| {
            tasks.iter().map(move |stored| LocationObservation {
                task_id: stored.record.id.clone(),
                branch: WORKING_COPY.to_string(),
                source: Source::Local,
                kind,
                path: stored.path.clone(),
                timestamp: stored.modified,
            })
        })
        .collect()
}

/// Run `work` over `items` with at most `limit` in flight.
///
/// Results come back in input order.
async fn run_bounded<T, R, F, Fut>(limit: usize, items: Vec<T>, work: F) -> Result<Vec<R>, CoreError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| CoreError::Worker(format!("semaphore closed: {e}")))?;
        let job = work(item);
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            job.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.map_err(|e| CoreError::Worker(e.to_string()))?);
    }
    Ok(results)
}
