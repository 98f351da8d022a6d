//! Column commands: `kanban column ...`.

use anyhow::Result;
use kanban::board::ManagerHandle;
use kanban_common::{Actor, ColumnDraft, ColumnOptions, ColumnUpdate};

use super::print_json;
use crate::ColumnCommands;

pub async fn cmd_column(handle: &ManagerHandle, actor: Actor, command: ColumnCommands) -> Result<()> {
    match command {
        ColumnCommands::Add {
            board_id,
            title,
            after,
            limit,
            auto_close,
            auto_hide,
        } => {
            let draft = ColumnDraft {
                title,
                options: ColumnOptions {
                    card_limit: limit.filter(|&l| l > 0),
                    auto_close,
                    auto_hide,
                },
            };
            let outcome = handle
                .call(move |m| m.add_column(actor, board_id, after, draft))
                .await?;
            print_json(&outcome.value)
        }
        ColumnCommands::Move { column_id, after } => {
            let outcome = handle
                .call(move |m| m.move_column(actor, column_id, after))
                .await?;
            print_json(&outcome.value)
        }
        ColumnCommands::Update {
            column_id,
            title,
            limit,
            auto_close,
            auto_hide,
        } => {
            let outcome = handle
                .call(move |m| {
                    let options = if limit.is_some() || auto_close.is_some() || auto_hide.is_some() {
                        let mut options = m.get_column(column_id)?.options;
                        if let Some(limit) = limit {
                            options.card_limit = (limit > 0).then_some(limit);
                        }
                        if let Some(auto_close) = auto_close {
                            options.auto_close = auto_close;
                        }
                        if let Some(auto_hide) = auto_hide {
                            options.auto_hide = auto_hide;
                        }
                        Some(options)
                    } else {
                        None
                    };
                    m.update_column(actor, column_id, ColumnUpdate { title, options })
                })
                .await?;
            print_json(&outcome.value)
        }
        ColumnCommands::Delete { column_id } => {
            handle
                .call(move |m| m.delete_column(actor, column_id))
                .await?;
            print_json(&serde_json::json!({ "deleted": column_id }))
        }
    }
}
