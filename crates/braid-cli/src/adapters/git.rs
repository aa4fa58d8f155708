//! Git-backed [`VersionControlProvider`] that shells out to the `git` binary.

use async_trait::async_trait;
use braid_core::model::{BranchKind, BranchRef};
use braid_core::provider::{ProviderError, VersionControlProvider};
use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const BRANCH_FORMAT: &str =
    "--format=%(refname)%09%(refname:short)%09%(committerdate:unix)%09%(HEAD)%09%(symref)";

#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    fetch_timeout: Duration,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    async fn run(&self, operation: &str, args: &[&str]) -> Result<String, ProviderError> {
        trace!(args = ?args, dir = %self.repo.display(), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("cannot run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::CommandFailed {
                operation: operation.to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ProviderError::InvalidOutput {
            operation: operation.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Full ref for a branch, so a tag or file with the same short name cannot
/// shadow it.
fn full_ref(branch: &BranchRef) -> String {
    match branch.kind {
        BranchKind::Local => format!("refs/heads/{}", branch.name),
        BranchKind::Remote => format!("refs/remotes/{}", branch.name),
    }
}

/// Parse one line of `for-each-ref` output produced with [`BRANCH_FORMAT`].
fn parse_branch_line(line: &str) -> Option<BranchRef> {
    let mut fields = line.split('\t');
    let refname = fields.next()?;
    let short = fields.next()?;
    let committed = fields.next().unwrap_or_default();
    let head = fields.next().unwrap_or_default();
    let symref = fields.next().unwrap_or_default();

    if !symref.is_empty() || refname.ends_with("/HEAD") {
        return None;
    }
    let mut branch = if let Some(name) = refname.strip_prefix("refs/heads/") {
        BranchRef::local(name)
    } else if let Some(name) = refname.strip_prefix("refs/remotes/") {
        BranchRef::remote(name)
    } else {
        return None;
    };
    if branch.name.is_empty() {
        branch.name = short.to_string();
    }
    branch.is_current = head.trim() == "*";
    branch.last_commit = committed
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    Some(branch)
}

#[async_trait]
impl VersionControlProvider for GitCli {
    async fn fetch_remotes(&self) -> Result<(), ProviderError> {
        let fetch = self.run("fetch", &["fetch", "--all", "--prune", "--quiet"]);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(ProviderError::Unavailable(format!(
                "fetch timed out after {}s",
                self.fetch_timeout.as_secs()
            ))),
        }
    }

    async fn list_branches(&self) -> Result<Vec<BranchRef>, ProviderError> {
        let listed = self
            .run(
                "for-each-ref",
                &["for-each-ref", BRANCH_FORMAT, "refs/heads", "refs/remotes"],
            )
            .await?;
        let branches: Vec<BranchRef> = listed.lines().filter_map(parse_branch_line).collect();
        debug!(branches = branches.len(), "listed branches");
        Ok(branches)
    }

    async fn list_files(&self, branch: &BranchRef, prefix: &str) -> Result<Vec<String>, ProviderError> {
        let rev = full_ref(branch);
        let listed = self
            .run(
                "ls-tree",
                &["ls-tree", "-r", "-z", "--name-only", &rev, "--", prefix],
            )
            .await?;
        Ok(listed
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn file_last_modified(
        &self,
        branch: &BranchRef,
        path: &str,
    ) -> Result<DateTime<Utc>, ProviderError> {
        let rev = full_ref(branch);
        let listed = self
            .run("log", &["log", "-1", "--format=%ct", &rev, "--", path])
            .await?;
        let raw = listed.trim();
        raw.parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| ProviderError::InvalidOutput {
                operation: "log".to_string(),
                detail: format!("no commit time for {path} (got `{raw}`)"),
            })
    }

    async fn read_file(&self, branch: &BranchRef, path: &str) -> Result<String, ProviderError> {
        let spec = format!("{}:{path}", full_ref(branch));
        self.run("show", &["show", &spec]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_local_current_branch() {
        let branch = parse_branch_line("refs/heads/main\tmain\t1700000000\t*\t").unwrap();
        assert_eq!(branch.name, "main");
        assert_eq!(branch.kind, BranchKind::Local);
        assert!(branch.is_current);
        assert_eq!(branch.last_commit.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_remote_branch_with_slashes() {
        let branch =
            parse_branch_line("refs/remotes/origin/feature/x\torigin/feature/x\t42\t \t").unwrap();
        assert_eq!(branch.name, "origin/feature/x");
        assert_eq!(branch.kind, BranchKind::Remote);
        assert!(!branch.is_current);
        assert_eq!(full_ref(&branch), "refs/remotes/origin/feature/x");
    }

    #[test]
    fn skips_symbolic_refs() {
        assert!(
            parse_branch_line("refs/remotes/origin/HEAD\torigin\t42\t \trefs/remotes/origin/main")
                .is_none()
        );
        assert!(parse_branch_line("refs/remotes/origin/HEAD\torigin/HEAD\t42\t \t").is_none());
    }

    #[test]
    fn tolerates_missing_commit_date() {
        let branch = parse_branch_line("refs/heads/empty\tempty\t\t \t").unwrap();
        assert!(branch.last_commit.is_none());
    }

    #[test]
    fn ignores_other_namespaces() {
        assert!(parse_branch_line("refs/tags/v1\tv1\t42\t \t").is_none());
        assert!(parse_branch_line("").is_none());
    }

    #[tokio::test]
    async fn outside_a_repository_every_call_fails_softly() {
        let dir = TempDir::new().unwrap();
        let git = GitCli::new(dir.path()).with_fetch_timeout(Duration::from_secs(5));
        assert!(git.fetch_remotes().await.is_err());
        assert!(git.list_branches().await.is_err());
        let err = git
            .read_file(&BranchRef::local("main"), "backlog/tasks/x.md")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::CommandFailed { .. } | ProviderError::Unavailable(_)
        ));
    }
}
