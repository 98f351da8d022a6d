use kanban_common::*;
use serde_json::{Value, json};

use super::{BoardManager, Outcome};
use crate::errors::Result;

impl BoardManager {
    /// Post a message on a card and raise its `has_discussion` flag.
    pub fn add_discussion_message(
        &self,
        actor: Actor,
        card_id: i64,
        content: String,
    ) -> Result<Outcome<DiscussionMessage>> {
        self.mutate(actor, "add_discussion_message", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            let draft = DiscussionMessage {
                id: 0,
                card_id: card.id,
                user_id: m.actor.user_id,
                content,
                created_at: m.now,
            };
            let message: DiscussionMessage = tx.get(tx.create(&draft)?)?;
            m.created(&message)?;

            if !card.has_discussion {
                card.has_discussion = true;
                card.updated_at = m.now;
                tx.update(&card)?;
                m.updated(EntityKind::Card, card.id, json!({ "has_discussion": true }));
            }
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Commented,
                Value::Null,
                json!({ "message_id": message.id }),
            );
            Ok(message)
        })
    }

    /// Remove a message; the card flag drops with the last one.
    pub fn delete_discussion_message(&self, actor: Actor, message_id: i64) -> Result<Outcome<()>> {
        self.mutate(actor, "delete_discussion_message", |tx, m| {
            let message: DiscussionMessage = tx.get(message_id)?;
            let mut card: Card = tx.get(message.card_id)?;
            tx.delete::<DiscussionMessage>(message.id)?;
            m.deleted(EntityKind::Discussion, message.id);

            let remaining = tx.find_children::<DiscussionMessage>(card.id)?;
            if remaining.is_empty() && card.has_discussion {
                card.has_discussion = false;
                card.updated_at = m.now;
                tx.update(&card)?;
                m.updated(EntityKind::Card, card.id, json!({ "has_discussion": false }));
            }
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::CommentDeleted,
                json!({ "message_id": message.id, "user_id": message.user_id }),
                Value::Null,
            );
            Ok(())
        })
    }

    /// Messages of a card, oldest first.
    pub fn list_discussion(&self, card_id: i64) -> Result<Vec<DiscussionMessage>> {
        self.read(|tx| {
            tx.get::<Card>(card_id)?;
            tx.find_children(card_id)
        })
    }
}
