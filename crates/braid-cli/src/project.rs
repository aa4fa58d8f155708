//! Project discovery and collaborator wiring shared by every command.

use anyhow::Context;
use braid_core::config::{CONFIG_PATH, ProjectConfig, load_project_config};
use braid_core::provider::VersionControlProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{FsTaskStore, GitCli, MarkdownDecoder};

/// An opened project: its root directory and validated config.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Find the project root above `start` and load its config.
    ///
    /// The root is the nearest ancestor holding `.braid/` or `.git`; without
    /// either, `start` itself is used.
    pub fn open(start: &Path) -> anyhow::Result<Self> {
        let root = find_root(start);
        let config = load_project_config(&root)
            .with_context(|| format!("loading {}", root.join(CONFIG_PATH).display()))?;
        Ok(Self { root, config })
    }

    pub fn provider(&self) -> Arc<dyn VersionControlProvider> {
        Arc::new(GitCli::new(&self.root))
    }

    pub fn store(&self) -> FsTaskStore<MarkdownDecoder> {
        FsTaskStore::new(&self.root, self.config.scan.task_root.clone(), MarkdownDecoder)
    }
}

fn find_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".braid").is_dir() || dir.join(".git").exists())
        .unwrap_or(start)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_marker_in_ancestor() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".braid")).unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested), dir.path());
    }

    #[test]
    fn defaults_without_config_file() {
        let dir = TempDir::new().unwrap();
        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.config, ProjectConfig::default());
    }

    #[test]
    fn invalid_strategy_fails_to_open() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".braid")).unwrap();
        fs::write(
            dir.path().join(".braid/config.toml"),
            "conflict_strategy = \"coin_flip\"\n",
        )
        .unwrap();
        let err = Project::open(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("coin_flip"));
    }
}
