//! Board commands: `kanban board ...` and `kanban overview`.

use anyhow::Result;
use kanban::board::ManagerHandle;
use kanban_common::{Actor, BoardOwner};

use super::print_json;
use crate::BoardCommands;

/// Parse `course`, `template`, `user:<id>` or `group:<id>`.
pub fn parse_owner(s: &str) -> Result<BoardOwner, String> {
    match s.split_once(':') {
        None if s == "course" => Ok(BoardOwner::Course),
        None if s == "template" => Ok(BoardOwner::Template),
        Some((kind, id)) => {
            let id: i64 = id
                .parse()
                .map_err(|_| format!("Invalid owner id '{}'", id))?;
            if id <= 0 {
                return Err(format!("Owner id must be positive, got {}", id));
            }
            match kind {
                "user" => Ok(BoardOwner::User(id)),
                "group" => Ok(BoardOwner::Group(id)),
                _ => Err(format!("Invalid owner kind '{}'", kind)),
            }
        }
        None => Err(format!(
            "Invalid owner '{}'. Valid values: course, template, user:<id>, group:<id>",
            s
        )),
    }
}

pub async fn cmd_board(handle: &ManagerHandle, actor: Actor, command: BoardCommands) -> Result<()> {
    match command {
        BoardCommands::Create {
            instance,
            owner,
            from,
            ensure,
        } => {
            let board = handle
                .call(move |m| {
                    let id = if ensure {
                        m.ensure_board(actor, instance, owner)?.value
                    } else {
                        m.create_board(actor, instance, owner, from)?.value
                    };
                    m.get_board(id)
                })
                .await?;
            print_json(&board)
        }
        BoardCommands::Show { board_id } => {
            print_json(&handle.call(move |m| m.load_board(board_id)).await?)
        }
        BoardCommands::Delete { board_id } => {
            handle.call(move |m| m.delete_board(actor, board_id)).await?;
            print_json(&serde_json::json!({ "deleted": board_id }))
        }
        BoardCommands::Export { board_id } => {
            print_json(&handle.call(move |m| m.export_board(board_id)).await?)
        }
        BoardCommands::Check { board_id } => {
            let problems = handle.call(move |m| m.verify_board(board_id)).await?;
            print_json(&serde_json::json!({ "board": board_id, "problems": problems }))?;
            if !problems.is_empty() {
                anyhow::bail!("Board {} has {} inconsistencies", board_id, problems.len());
            }
            Ok(())
        }
        BoardCommands::History { board_id } => {
            print_json(&handle.call(move |m| m.board_history(board_id)).await?)
        }
    }
}

pub async fn cmd_overview(handle: &ManagerHandle, instance: i64, user_id: i64) -> Result<()> {
    let cards = handle
        .call(move |m| m.uncompleted_assigned_cards(instance, user_id))
        .await?;
    print_json(&cards)
}
