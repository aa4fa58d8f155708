use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::conflict::ConflictStrategy;
use crate::error::ErrorCode;

/// Project config location, relative to the repository root.
pub const CONFIG_PATH: &str = ".braid/config.toml";

/// Upper bound on simultaneous branch scans regardless of configuration.
pub const MAX_SCAN_CONCURRENCY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown conflict strategy `{0}` (expected `most_progressed` or `most_recent`)")]
    UnknownConflictStrategy(String),

    #[error("invalid config value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::UnknownConflictStrategy(_) => ErrorCode::UnknownConflictStrategy,
            Self::InvalidValue { .. } => ErrorCode::InvalidConfigValue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Board columns, in display order. Also the progress scale used by the
    /// `most_progressed` strategy.
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    #[serde(default = "default_conflict_strategy")]
    pub conflict_strategy: String,
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            conflict_strategy: default_conflict_strategy(),
            scan: ScanConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// The configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownConflictStrategy`] for anything other
    /// than the two known names. There is no fallback.
    pub fn strategy(&self) -> Result<ConflictStrategy, ConfigError> {
        self.conflict_strategy.parse()
    }

    /// Reject configs that would make resolution meaningless.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy()?;

        if self.statuses.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "statuses",
                reason: "at least one status is required".to_string(),
            });
        }
        for (idx, status) in self.statuses.iter().enumerate() {
            if status.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "statuses",
                    reason: format!("status #{} is empty", idx + 1),
                });
            }
            if self.statuses[..idx].contains(status) {
                return Err(ConfigError::InvalidValue {
                    key: "statuses",
                    reason: format!("status `{status}` is listed twice"),
                });
            }
        }

        let root = self.scan.task_root.trim_matches('/');
        if root.is_empty() || root.split('/').any(|part| part == "..") {
            return Err(ConfigError::InvalidValue {
                key: "scan.task_root",
                reason: format!("`{}` is not a repository-relative directory", self.scan.task_root),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory holding `tasks/`, `drafts/` and `archive/tasks/`.
    #[serde(default = "default_task_root")]
    pub task_root: String,
    /// Fetch and scan remote-tracking branches.
    #[serde(default = "default_true")]
    pub remote_operations: bool,
    /// Scan local branches other than the checked-out one.
    #[serde(default = "default_true")]
    pub check_local_branches: bool,
    /// Skip branches whose tip is older than this many days. `0` keeps all.
    #[serde(default = "default_active_branch_days")]
    pub active_branch_days: u32,
    /// Simultaneous branch scans, clamped to `1..=MAX_SCAN_CONCURRENCY`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            task_root: default_task_root(),
            remote_operations: default_true(),
            check_local_branches: default_true(),
            active_branch_days: default_active_branch_days(),
            concurrency: default_concurrency(),
        }
    }
}

impl ScanConfig {
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_SCAN_CONCURRENCY)
    }

    /// Repository-relative directory for one location kind.
    #[must_use]
    pub fn dir_for(&self, kind: crate::model::LocationKind) -> String {
        format!("{}/{}", self.task_root.trim_matches('/'), kind.subdir())
    }
}

fn default_true() -> bool {
    true
}

fn default_statuses() -> Vec<String> {
    ["To Do", "In Progress", "Done"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_conflict_strategy() -> String {
    ConflictStrategy::MostProgressed.as_str().to_string()
}

fn default_task_root() -> String {
    "backlog".to_string()
}

const fn default_active_branch_days() -> u32 {
    30
}

const fn default_concurrency() -> usize {
    8
}

/// Load `.braid/config.toml` under `project_root`, falling back to defaults
/// when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if it fails
/// [`ProjectConfig::validate`].
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = project_root.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationKind;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir.join(".braid")).unwrap();
        std::fs::write(dir.join(CONFIG_PATH), body).unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_project_config(tmp.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.statuses, ["To Do", "In Progress", "Done"]);
        assert_eq!(config.strategy().unwrap(), ConflictStrategy::MostProgressed);
        assert_eq!(config.scan.task_root, "backlog");
        assert_eq!(config.scan.effective_concurrency(), 8);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        write_config(
            tmp.path(),
            r#"
conflict_strategy = "most_recent"

[scan]
task_root = "work"
concurrency = 64
"#,
        );
        let config = load_project_config(tmp.path()).unwrap();
        assert_eq!(config.strategy().unwrap(), ConflictStrategy::MostRecent);
        assert_eq!(config.statuses.len(), 3);
        assert_eq!(config.scan.effective_concurrency(), MAX_SCAN_CONCURRENCY);
        assert!(config.scan.remote_operations);
        assert_eq!(config.scan.dir_for(LocationKind::Archived), "work/archive/tasks");
    }

    #[test]
    fn unknown_strategy_fails_fast() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "conflict_strategy = \"newest_wins\"\n");
        let err = load_project_config(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConflictStrategy(ref s) if s == "newest_wins"));
        assert_eq!(err.code(), ErrorCode::UnknownConflictStrategy);
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "statuses = [\n");
        let err = load_project_config(tmp.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn duplicate_or_empty_statuses_rejected() {
        let mut config = ProjectConfig {
            statuses: vec!["To Do".into(), "To Do".into()],
            ..ProjectConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: "statuses", .. })
        ));

        config.statuses.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn escaping_task_root_rejected() {
        let mut config = ProjectConfig::default();
        config.scan.task_root = "../elsewhere".to_string();
        assert!(config.validate().is_err());
    }
}
