//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module       | Commands handled          |
//! |--------------|---------------------------|
//! | `board`      | `Board`, `Overview`       |
//! | `column`     | `Column`                  |
//! | `card`       | `Card`                    |
//! | `discussion` | `Discussion`              |
//!
//! `Init` lives here. Every command prints JSON on stdout.

pub mod board;
pub mod card;
pub mod column;
pub mod discussion;

pub use board::{cmd_board, cmd_overview};
pub use card::cmd_card;
pub use column::cmd_column;
pub use discussion::cmd_discussion;

use anyhow::{Context, Result};
use kanban::board::{BoardDb, BoardManager, ManagerHandle};
use kanban::config::{DEFAULT_CONFIG_FILE, KanbanConfig, KanbanToml};
use serde::Serialize;

/// Open the configured database and wrap a manager around it.
pub fn open_handle(config: &KanbanConfig) -> Result<ManagerHandle> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = BoardDb::open_with_timeout(&db_path, config.busy_timeout())?;
    tracing::debug!(path = %db_path.display(), "Opened board database");
    Ok(ManagerHandle::new(BoardManager::new(db, config.manager_settings())))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

/// `kanban init`: write kanban.toml and create the database.
pub fn cmd_init(cli: &crate::Cli, config: &KanbanConfig, force: bool) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());
    let wrote_config = if config_path.exists() && !force {
        false
    } else {
        let mut toml = KanbanToml::default();
        toml.database.path = config.db_path();
        toml.save(&config_path)?;
        true
    };

    open_handle(config)?;
    tracing::info!(config = %config_path.display(), db = %config.db_path().display(), "Initialized");
    print_json(&serde_json::json!({
        "config": config_path,
        "config_written": wrote_config,
        "database": config.db_path(),
    }))
}
