//! Discussion commands: `kanban discussion ...`.

use anyhow::Result;
use kanban::board::ManagerHandle;
use kanban_common::Actor;

use super::print_json;
use crate::DiscussionCommands;

pub async fn cmd_discussion(
    handle: &ManagerHandle,
    actor: Actor,
    command: DiscussionCommands,
) -> Result<()> {
    match command {
        DiscussionCommands::Add { card_id, message } => {
            let outcome = handle
                .call(move |m| m.add_discussion_message(actor, card_id, message))
                .await?;
            print_json(&outcome.value)
        }
        DiscussionCommands::List { card_id } => {
            print_json(&handle.call(move |m| m.list_discussion(card_id)).await?)
        }
        DiscussionCommands::Delete { message_id } => {
            handle
                .call(move |m| m.delete_discussion_message(actor, message_id))
                .await?;
            print_json(&serde_json::json!({ "deleted": message_id }))
        }
    }
}
