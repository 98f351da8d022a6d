use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use kanban::config::KanbanConfig;
use kanban_common::{Actor, BoardOwner};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(version, about = "Kanban boards with ordered columns and cards")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to kanban.toml (defaults to ./kanban.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path. Overrides kanban.toml and KANBAN_DB_PATH.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// User id performing the operation
    #[arg(long, global = true, env = "KANBAN_ACTOR", default_value_t = 0)]
    pub actor: i64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default kanban.toml and create the database
    Init {
        /// Overwrite an existing kanban.toml
        #[arg(long)]
        force: bool,
    },
    /// Create, inspect and delete boards
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },
    /// Manage the columns of a board
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Card discussion messages
    Discussion {
        #[command(subcommand)]
        command: DiscussionCommands,
    },
    /// Open cards assigned to a user across an instance
    Overview {
        #[arg(long, default_value_t = 1)]
        instance: i64,
        /// Defaults to --actor
        #[arg(long)]
        user: Option<i64>,
    },
}

#[derive(Subcommand, Clone)]
pub enum BoardCommands {
    /// Create a board with default columns, a copy of another board, or the
    /// instance template
    Create {
        #[arg(long, default_value_t = 1)]
        instance: i64,
        /// course, template, user:<id> or group:<id>
        #[arg(long, default_value = "course", value_parser = cmd::board::parse_owner)]
        owner: BoardOwner,
        /// Clone columns and cards of this board
        #[arg(long, conflicts_with = "ensure")]
        from: Option<i64>,
        /// Return the owner's existing board instead of creating a second one
        #[arg(long)]
        ensure: bool,
    },
    /// Print a board with its columns and cards
    Show { board_id: i64 },
    /// Delete a board and everything on it
    Delete { board_id: i64 },
    /// Print column titles and card rows
    Export { board_id: i64 },
    /// Report ordering inconsistencies; fails when any are found
    Check { board_id: i64 },
    /// Print the board's history
    History { board_id: i64 },
}

#[derive(Subcommand, Clone)]
pub enum ColumnCommands {
    Add {
        board_id: i64,
        title: String,
        /// Column to insert after (0 = first)
        #[arg(long, default_value_t = 0)]
        after: i64,
        /// Advisory card limit
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        auto_close: bool,
        #[arg(long)]
        auto_hide: bool,
    },
    Move {
        column_id: i64,
        #[arg(long, default_value_t = 0)]
        after: i64,
    },
    Update {
        column_id: i64,
        #[arg(long)]
        title: Option<String>,
        /// Advisory card limit, 0 removes it
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        auto_close: Option<bool>,
        #[arg(long)]
        auto_hide: Option<bool>,
    },
    Delete {
        column_id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitArg {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Subcommand, Clone)]
pub enum CardCommands {
    Add {
        column_id: i64,
        title: String,
        /// Card to insert after (0 = top)
        #[arg(long, default_value_t = 0)]
        after: i64,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date (RFC 3339)
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// Assignee user id (repeatable)
        #[arg(long = "assign")]
        assignees: Vec<i64>,
        /// Repeat the card every N units once completed
        #[arg(long)]
        repeat_every: Option<u32>,
        #[arg(long, value_enum, default_value = "week")]
        repeat_unit: UnitArg,
        /// Count the next due date from completion instead of the due date
        #[arg(long)]
        repeat_from_completion: bool,
    },
    Move {
        card_id: i64,
        #[arg(long, default_value_t = 0)]
        after: i64,
        /// Target column (defaults to the card's column)
        #[arg(long)]
        column: Option<i64>,
    },
    Update {
        card_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,
        #[arg(long)]
        clear_due: bool,
        /// Background colour
        #[arg(long)]
        background: Option<String>,
    },
    Delete {
        card_id: i64,
    },
    Duplicate {
        card_id: i64,
        #[arg(long)]
        after: Option<i64>,
    },
    /// Copy the card to every other board of the instance
    Push {
        card_id: i64,
    },
    Complete {
        card_id: i64,
    },
    Reopen {
        card_id: i64,
    },
    Assign {
        card_id: i64,
        user_id: i64,
    },
    Unassign {
        card_id: i64,
        user_id: i64,
    },
    History {
        card_id: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum DiscussionCommands {
    Add { card_id: i64, message: String },
    List { card_id: i64 },
    Delete { message_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = KanbanConfig::with_cli_args(cli.config.as_deref(), cli.db.clone(), cli.verbose)?;
    let _log_guard = kanban::telemetry::init_tracing(&config.toml.logging, &config.log_level())?;
    for warning in config.toml.validate() {
        tracing::warn!(%warning, "Configuration warning");
    }

    let actor = Actor::new(cli.actor);
    match &cli.command {
        Commands::Init { force } => cmd::cmd_init(&cli, &config, *force)?,
        Commands::Board { command } => {
            cmd::cmd_board(&cmd::open_handle(&config)?, actor, command.clone()).await?
        }
        Commands::Column { command } => {
            cmd::cmd_column(&cmd::open_handle(&config)?, actor, command.clone()).await?
        }
        Commands::Card { command } => {
            cmd::cmd_card(&cmd::open_handle(&config)?, actor, command.clone()).await?
        }
        Commands::Discussion { command } => {
            cmd::cmd_discussion(&cmd::open_handle(&config)?, actor, command.clone()).await?
        }
        Commands::Overview { instance, user } => {
            let user = user.unwrap_or(actor.user_id);
            cmd::cmd_overview(&cmd::open_handle(&config)?, *instance, user).await?
        }
    }

    Ok(())
}
