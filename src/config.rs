//! Configuration for the kanban core, read from `kanban.toml`.
//!
//! Layered file → environment → CLI:
//!
//! ```toml
//! [database]
//! path = "kanban.db"
//! busy_timeout_ms = 5000
//!
//! [board]
//! default_columns = ["To do", "Doing", "Done"]
//! autoclose_last_column = true
//! use_numbers = false
//!
//! [history]
//! enabled = true
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = "logs"
//! ```
//!
//! Environment overrides: `KANBAN_DB_PATH`, `KANBAN_LOG_LEVEL`,
//! `KANBAN_HISTORY`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::board::ManagerSettings;

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "kanban.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file holding all boards
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a writer waits for the lock held by another connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("kanban.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    /// Columns of a new board when no template exists
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,
    #[serde(default = "default_true")]
    pub autoclose_last_column: bool,
    #[serde(default)]
    pub use_numbers: bool,
}

fn default_columns() -> Vec<String> {
    vec!["To do".to_string(), "Doing".to_string(), "Done".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            default_columns: default_columns(),
            autoclose_last_column: true,
            use_numbers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Write daily rolling log files here instead of stderr
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

/// The complete kanban.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KanbanToml {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl KanbanToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse kanban.toml")
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize kanban.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("KANBAN_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = lookup("KANBAN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(history) = lookup("KANBAN_HISTORY") {
            self.history.enabled = !matches!(history.to_lowercase().as_str(), "false" | "0" | "off");
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.board.default_columns.is_empty() {
            warnings.push("board.default_columns is empty: new boards start without columns".to_string());
        }
        if self.board.default_columns.iter().any(|t| t.trim().is_empty()) {
            warnings.push("board.default_columns contains a blank title".to_string());
        }
        if self.database.busy_timeout_ms == 0 {
            warnings.push(
                "database.busy_timeout_ms is 0: concurrent writers fail immediately".to_string(),
            );
        }

        warnings
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            default_columns: self.board.default_columns.clone(),
            autoclose_last_column: self.board.autoclose_last_column,
            use_numbers: self.board.use_numbers,
            history: self.history.enabled,
        }
    }
}

/// Resolved configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct KanbanConfig {
    /// Parsed kanban.toml with environment overrides applied
    pub toml: KanbanToml,
    /// CLI override: database path
    pub cli_db_path: Option<PathBuf>,
    /// CLI override: verbose logging
    pub verbose: bool,
}

impl KanbanConfig {
    /// Read `config_path` (or `kanban.toml` in the working directory) and the
    /// process environment. A missing file means defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let mut toml = KanbanToml::load_or_default(path)?;
        toml.apply_env_from(|key| std::env::var(key).ok());

        Ok(Self {
            toml,
            cli_db_path: None,
            verbose: false,
        })
    }

    /// Create KanbanConfig with CLI overrides.
    pub fn with_cli_args(
        config_path: Option<&Path>,
        db_path: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;
        config.cli_db_path = db_path;
        config.verbose = verbose;
        Ok(config)
    }

    /// Database path (CLI → env → file → default).
    pub fn db_path(&self) -> PathBuf {
        self.cli_db_path
            .clone()
            .unwrap_or_else(|| self.toml.database.path.clone())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.toml.database.busy_timeout_ms)
    }

    /// Log filter directive; `--verbose` forces debug.
    pub fn log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.toml.logging.level.clone()
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        self.toml.manager_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let toml = KanbanToml::default();
        assert_eq!(toml.database.path, PathBuf::from("kanban.db"));
        assert_eq!(toml.database.busy_timeout_ms, 5000);
        assert_eq!(toml.board.default_columns, vec!["To do", "Doing", "Done"]);
        assert!(toml.board.autoclose_last_column);
        assert!(toml.history.enabled);
        assert_eq!(toml.logging.level, "info");
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_file() {
        let content = r#"
[database]
path = "/var/lib/kanban/boards.db"

[board]
default_columns = ["Backlog", "Done"]
use_numbers = true

[logging]
json = true
"#;
        let toml = KanbanToml::parse(content).unwrap();
        assert_eq!(toml.database.path, PathBuf::from("/var/lib/kanban/boards.db"));
        assert_eq!(toml.database.busy_timeout_ms, 5000);
        assert_eq!(toml.board.default_columns, vec!["Backlog", "Done"]);
        assert!(toml.board.use_numbers);
        assert!(toml.board.autoclose_last_column);
        assert!(toml.logging.json);
        assert_eq!(toml.logging.level, "info");

        let settings = toml.manager_settings();
        assert_eq!(settings.default_columns.len(), 2);
        assert!(settings.use_numbers);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(KanbanToml::parse("[history]\nenabled = \"maybe\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut toml = KanbanToml::parse("[history]\nenabled = true").unwrap();
        let env: HashMap<&str, &str> = [
            ("KANBAN_DB_PATH", "/tmp/other.db"),
            ("KANBAN_LOG_LEVEL", "kanban=trace"),
            ("KANBAN_HISTORY", "false"),
        ]
        .into_iter()
        .collect();
        toml.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(toml.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(toml.logging.level, "kanban=trace");
        assert!(!toml.history.enabled);
        assert!(!toml.manager_settings().history);
    }

    #[test]
    fn test_validate_warnings() {
        let toml = KanbanToml::parse(
            "[board]\ndefault_columns = []\n[database]\nbusy_timeout_ms = 0",
        )
        .unwrap();
        assert_eq!(toml.validate().len(), 2);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kanban.toml");
        let mut toml = KanbanToml::default();
        toml.board.use_numbers = true;
        toml.logging.directory = Some(PathBuf::from("logs"));
        toml.save(&path).unwrap();

        let loaded = KanbanToml::load(&path).unwrap();
        assert!(loaded.board.use_numbers);
        assert_eq!(loaded.logging.directory, Some(PathBuf::from("logs")));
        assert!(KanbanToml::load_or_default(&dir.path().join("missing.toml")).is_ok());
    }

    #[test]
    fn test_cli_db_path_wins() {
        let config = KanbanConfig {
            toml: KanbanToml::default(),
            cli_db_path: Some(PathBuf::from("cli.db")),
            verbose: true,
        };
        assert_eq!(config.db_path(), PathBuf::from("cli.db"));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }
}
