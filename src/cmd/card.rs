//! Card commands: `kanban card ...`.

use anyhow::Result;
use kanban::board::ManagerHandle;
use kanban_common::{
    Actor, CardDraft, CardOptions, CardUpdate, RepeatBase, RepeatRule, RepeatUnit,
};

use super::print_json;
use crate::{CardCommands, UnitArg};

impl From<UnitArg> for RepeatUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Day => RepeatUnit::Day,
            UnitArg::Week => RepeatUnit::Week,
            UnitArg::Month => RepeatUnit::Month,
            UnitArg::Year => RepeatUnit::Year,
        }
    }
}

pub async fn cmd_card(handle: &ManagerHandle, actor: Actor, command: CardCommands) -> Result<()> {
    match command {
        CardCommands::Add {
            column_id,
            title,
            after,
            description,
            due,
            assignees,
            repeat_every,
            repeat_unit,
            repeat_from_completion,
        } => {
            let repeat = match repeat_every {
                Some(interval) => RepeatRule {
                    enabled: true,
                    interval: interval.max(1),
                    unit: repeat_unit.into(),
                    base: if repeat_from_completion {
                        RepeatBase::Completion
                    } else {
                        RepeatBase::DueDate
                    },
                },
                None => RepeatRule::default(),
            };
            let draft = CardDraft {
                title,
                description,
                due_date: due,
                assignees,
                options: CardOptions::default(),
                repeat,
            };
            let outcome = handle
                .call(move |m| m.add_card(actor, column_id, after, draft))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Move {
            card_id,
            after,
            column,
        } => {
            let outcome = handle
                .call(move |m| m.move_card(actor, card_id, after, column))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Update {
            card_id,
            title,
            description,
            due,
            clear_due,
            background,
        } => {
            let update = CardUpdate {
                title,
                description,
                due_date: if clear_due { Some(None) } else { due.map(Some) },
                options: background.map(|b| CardOptions {
                    background: Some(b).filter(|b| !b.is_empty()),
                }),
                repeat: None,
                has_attachment: None,
            };
            let outcome = handle
                .call(move |m| m.update_card(actor, card_id, update))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Delete { card_id } => {
            handle.call(move |m| m.delete_card(actor, card_id)).await?;
            print_json(&serde_json::json!({ "deleted": card_id }))
        }
        CardCommands::Duplicate { card_id, after } => {
            let outcome = handle
                .call(move |m| m.duplicate_card(actor, card_id, after))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Push { card_id } => {
            let outcome = handle.call(move |m| m.push_card(actor, card_id)).await?;
            print_json(&outcome.value)
        }
        CardCommands::Complete { card_id } => {
            let outcome = handle
                .call(move |m| m.complete_card(actor, card_id))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Reopen { card_id } => {
            let outcome = handle
                .call(move |m| m.uncomplete_card(actor, card_id))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Assign { card_id, user_id } => {
            let outcome = handle
                .call(move |m| m.assign_user(actor, card_id, user_id))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::Unassign { card_id, user_id } => {
            let outcome = handle
                .call(move |m| m.unassign_user(actor, card_id, user_id))
                .await?;
            print_json(&outcome.value)
        }
        CardCommands::History { card_id } => {
            print_json(&handle.call(move |m| m.card_history(card_id)).await?)
        }
    }
}
