//! Working-copy task store.
//!
//! Reads `<task_root>/tasks`, `<task_root>/drafts` and
//! `<task_root>/archive/tasks` from disk. Only direct children whose name
//! matches `task-<id> - <title>.md` are considered. Files that cannot be read
//! as UTF-8 or fail to decode are skipped and listed in
//! [`TaskListing::skipped`]; only an unlistable directory is an error.
//!
//! A file's timestamp is its last commit time when git reports it clean, and
//! its on-disk modification time otherwise (uncommitted edits, untracked
//! files, or no repository at all).

use braid_core::model::{LocationKind, parse_task_file_name};
use braid_core::provider::{
    DecodeError, LocalTaskStore, ProviderError, StoredTask, TaskDecoder, TaskListing,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

pub struct FsTaskStore<D> {
    repo_root: PathBuf,
    task_root: String,
    decoder: D,
}

impl<D: TaskDecoder> FsTaskStore<D> {
    pub fn new(repo_root: impl Into<PathBuf>, task_root: impl Into<String>, decoder: D) -> Self {
        Self {
            repo_root: repo_root.into(),
            task_root: task_root.into(),
            decoder,
        }
    }

    fn relative_dir(&self, kind: LocationKind) -> String {
        format!("{}/{}", self.task_root.trim_matches('/'), kind.subdir())
    }

    fn load(&self, kind: LocationKind) -> Result<TaskListing, ProviderError> {
        let rel_dir = self.relative_dir(kind);
        let dir = self.repo_root.join(&rel_dir);
        if !dir.is_dir() {
            return Ok(TaskListing::default());
        }

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if parse_task_file_name(&name).is_some() {
                files.push((format!("{rel_dir}/{name}"), entry.path()));
            }
        }
        files.sort();

        let dirty = dirty_paths(&self.repo_root, &rel_dir);
        let mut listing = TaskListing::default();
        for (rel_path, abs_path) in files {
            let decoded = fs::read_to_string(&abs_path)
                .map_err(|err| DecodeError::new(&rel_path, err.to_string()))
                .and_then(|content| self.decoder.decode(&rel_path, &content));
            let record = match decoded {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %rel_path, error = %err.reason, "skipping unreadable task file");
                    listing.skipped.push(err);
                    continue;
                }
            };
            let modified = match dirty.as_ref() {
                Some(dirty) if !dirty.contains(&rel_path) => {
                    commit_time(&self.repo_root, &rel_path).map_or_else(|| mtime(&abs_path), Ok)
                }
                _ => mtime(&abs_path),
            };
            let modified = match modified {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(path = %rel_path, error = %err, "task file vanished while loading");
                    listing.skipped.push(DecodeError::new(rel_path, err.to_string()));
                    continue;
                }
            };
            listing.tasks.push(StoredTask {
                record,
                path: rel_path,
                modified,
            });
        }
        debug!(
            dir = %rel_dir,
            tasks = listing.tasks.len(),
            skipped = listing.skipped.len(),
            "loaded working-copy tasks"
        );
        Ok(listing)
    }
}

impl<D: TaskDecoder> LocalTaskStore for FsTaskStore<D> {
    fn list_active_tasks(&self) -> Result<TaskListing, ProviderError> {
        self.load(LocationKind::Active)
    }

    fn list_drafts(&self) -> Result<TaskListing, ProviderError> {
        self.load(LocationKind::Draft)
    }

    fn list_archived(&self) -> Result<TaskListing, ProviderError> {
        self.load(LocationKind::Archived)
    }
}

fn mtime(path: &Path) -> Result<DateTime<Utc>, ProviderError> {
    Ok(DateTime::<Utc>::from(fs::metadata(path)?.modified()?))
}

/// Paths under `rel_dir` with uncommitted changes, or `None` when git cannot
/// answer (not a repository, git missing).
fn dirty_paths(repo_root: &Path, rel_dir: &str) -> Option<HashSet<String>> {
    let output = Command::new("git")
        .args(["status", "--porcelain", "-z", "--untracked-files=all", "--", rel_dir])
        .current_dir(repo_root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let listed = String::from_utf8(output.stdout).ok()?;
    let mut dirty = HashSet::new();
    let mut entries = listed.split('\0').filter(|entry| !entry.is_empty());
    while let Some(entry) = entries.next() {
        let Some(path) = entry.get(3..) else {
            continue;
        };
        dirty.insert(path.to_string());
        // Renames and copies carry the source path as a second entry.
        if matches!(entry.as_bytes().first(), Some(b'R' | b'C'))
            && let Some(source) = entries.next()
        {
            dirty.insert(source.to_string());
        }
    }
    Some(dirty)
}

fn commit_time(repo_root: &Path, rel_path: &str) -> Option<DateTime<Utc>> {
    let output = Command::new("git")
        .args(["log", "-1", "--format=%ct", "--", rel_path])
        .current_dir(repo_root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let secs: i64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::markdown::MarkdownDecoder;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, status: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!("---\nstatus: {status}\ncreated_date: 2025-06-01\n---\nbody\n"),
        )
        .unwrap();
    }

    fn store(root: &Path) -> FsTaskStore<MarkdownDecoder> {
        FsTaskStore::new(root, "backlog", MarkdownDecoder)
    }

    #[test]
    fn missing_directories_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        assert!(store.list_active_tasks().unwrap().tasks.is_empty());
        assert!(store.list_drafts().unwrap().tasks.is_empty());
        assert!(store.list_archived().unwrap().tasks.is_empty());
    }

    #[test]
    fn reads_each_location_kind() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "backlog/tasks/task-2 - Two.md", "To Do");
        write(dir.path(), "backlog/tasks/task-1 - One.md", "Done");
        write(dir.path(), "backlog/drafts/task-3 - Three.md", "To Do");
        write(dir.path(), "backlog/archive/tasks/task-4 - Four.md", "Done");
        let store = store(dir.path());

        let active = store.list_active_tasks().unwrap().tasks;
        let paths: Vec<&str> = active.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(
            paths,
            ["backlog/tasks/task-1 - One.md", "backlog/tasks/task-2 - Two.md"]
        );
        assert_eq!(active[0].record.status, "Done");
        assert_eq!(active[1].record.title, "Two");

        assert_eq!(store.list_drafts().unwrap().tasks[0].record.id.to_string(), "task-3");
        assert_eq!(store.list_archived().unwrap().tasks[0].record.id.to_string(), "task-4");
    }

    #[test]
    fn ignores_non_task_files_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "backlog/tasks/task-1 - One.md", "To Do");
        write(dir.path(), "backlog/tasks/README.md", "To Do");
        write(dir.path(), "backlog/tasks/nested/task-9 - Deep.md", "To Do");
        let listing = store(dir.path()).list_active_tasks().unwrap();
        assert_eq!(listing.tasks.len(), 1);
        assert!(listing.skipped.is_empty());
    }

    #[test]
    fn malformed_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "backlog/tasks/task-1 - One.md", "To Do");
        let broken = dir.path().join("backlog/tasks/task-2 - Broken.md");
        fs::write(broken, "no frontmatter here").unwrap();
        let listing = store(dir.path()).list_active_tasks().unwrap();
        assert_eq!(listing.tasks.len(), 1);
        assert_eq!(listing.tasks[0].record.id.to_string(), "task-1");
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].path, "backlog/tasks/task-2 - Broken.md");
    }

    #[test]
    fn non_utf8_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "backlog/tasks/task-1 - One.md", "To Do");
        fs::write(dir.path().join("backlog/tasks/task-2 - Bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let listing = store(dir.path()).list_active_tasks().unwrap();
        assert_eq!(listing.tasks.len(), 1);
        assert_eq!(listing.tasks[0].record.id.to_string(), "task-1");
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].path, "backlog/tasks/task-2 - Bad.md");
    }

    #[test]
    fn uncommitted_files_use_mtime() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "backlog/tasks/task-1 - One.md", "To Do");
        let abs = dir.path().join("backlog/tasks/task-1 - One.md");
        let expected = mtime(&abs).unwrap();
        let tasks = store(dir.path()).list_active_tasks().unwrap().tasks;
        assert_eq!(tasks[0].modified, expected);
    }
}
