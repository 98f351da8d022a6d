use kanban_common::*;
use serde_json::{Value, json};

use super::{BoardManager, FieldDiff, Mutation, Outcome};
use crate::board::db::StoreTx;
use crate::errors::{BoardError, Result};

/// Remove a card row together with its discussion and history.
/// The caller owns the column sequence update.
pub(super) fn purge_card(tx: &StoreTx<'_>, card_id: i64) -> Result<()> {
    tx.delete_children::<DiscussionMessage>(card_id)?;
    tx.delete_history_of(EntityKind::Card, card_id)?;
    tx.delete::<Card>(card_id)
}

fn unique(ids: Vec<i64>) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Insert `card` into `column_id` after `after` and emit the events.
fn place_card(
    tx: &StoreTx<'_>,
    m: &mut Mutation,
    card: &Card,
    column_id: i64,
    after: i64,
) -> Result<Card> {
    let mut column: Column = tx.get(column_id)?;
    let draft = Card {
        board_id: column.board_id,
        column_id: column.id,
        number: tx.next_card_number(column.board_id)?,
        created_at: m.now,
        updated_at: m.now,
        ..card.clone()
    };
    let id = tx.create(&draft)?;
    column.sequence.insert_after(id, after)?;
    column.updated_at = m.now;
    tx.update(&column)?;

    let stored: Card = tx.get(id)?;
    m.created(&stored)?;
    m.updated(EntityKind::Column, column.id, json!({ "sequence": column.sequence }));
    if column.is_over_limit() {
        m.warn(format!(
            "column {} holds {} cards, above its limit of {}",
            column.id,
            column.sequence.len(),
            column.options.card_limit.unwrap_or_default()
        ));
    }
    Ok(stored)
}

/// Mark `card` completed (the caller writes the row). An enabled repeat rule
/// spawns the next occurrence at the head of the board's first column and is
/// then switched off on the completed card.
fn complete_in(tx: &StoreTx<'_>, m: &mut Mutation, card: &mut Card) -> Result<Option<Card>> {
    if card.completed {
        return Ok(None);
    }
    card.completed = true;
    m.log(
        card.board_id,
        EntityKind::Card,
        card.id,
        HistoryAction::Completed,
        json!({ "completed": false }),
        json!({ "completed": true }),
    );

    let Some(due_date) = card.repeat.next_due_date(card.due_date, m.now) else {
        return Ok(None);
    };
    let board: Board = tx.get(card.board_id)?;
    let column_id = board.sequence.first().unwrap_or(card.column_id);
    let next = Card {
        id: 0,
        completed: false,
        due_date: Some(due_date),
        has_discussion: false,
        has_attachment: false,
        created_by: m.actor.user_id,
        original_id: None,
        ..card.clone()
    };
    card.repeat.enabled = false;
    let next = place_card(tx, m, &next, column_id, HEAD)?;
    m.log(
        next.board_id,
        EntityKind::Card,
        next.id,
        HistoryAction::Created,
        Value::Null,
        json!({ "title": next.title, "repeat_of": card.id, "due_date": next.due_date }),
    );
    Ok(Some(next))
}

impl BoardManager {
    /// Add a card to `column_id` after `after_card_id` (0 = top).
    pub fn add_card(
        &self,
        actor: Actor,
        column_id: i64,
        after_card_id: i64,
        draft: CardDraft,
    ) -> Result<Outcome<Card>> {
        self.mutate(actor, "add_card", |tx, m| {
            let column: Column = tx.get(column_id)?;
            let card = Card {
                id: 0,
                number: 0,
                board_id: column.board_id,
                column_id: column.id,
                title: draft.title,
                description: draft.description,
                due_date: draft.due_date,
                completed: column.options.auto_close,
                assignees: unique(draft.assignees),
                has_discussion: false,
                has_attachment: false,
                options: draft.options,
                repeat: draft.repeat,
                created_by: m.actor.user_id,
                original_id: None,
                created_at: m.now,
                updated_at: m.now,
            };
            let card = place_card(tx, m, &card, column.id, after_card_id)?;
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Created,
                Value::Null,
                json!({ "title": card.title, "column_id": card.column_id, "after": after_card_id }),
            );
            Ok(card)
        })
    }

    /// Move a card after `after_card_id` (0 = top) within its column, or into
    /// `target_column_id` of the same board.
    pub fn move_card(
        &self,
        actor: Actor,
        card_id: i64,
        after_card_id: i64,
        target_column_id: Option<i64>,
    ) -> Result<Outcome<Card>> {
        self.mutate(actor, "move_card", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            let mut source: Column = tx.get(card.column_id)?;
            let previous = source.sequence.predecessor(card.id);
            let target_id = target_column_id.unwrap_or(source.id);

            if target_id == source.id {
                let before = source.sequence.clone();
                source.sequence.move_after(card.id, after_card_id)?;
                if source.sequence == before {
                    return Ok(card);
                }
                source.updated_at = m.now;
                tx.update(&source)?;
                m.updated(EntityKind::Column, source.id, json!({ "sequence": source.sequence }));
                m.log(
                    card.board_id,
                    EntityKind::Card,
                    card.id,
                    HistoryAction::Moved,
                    json!({ "column_id": source.id, "after": previous }),
                    json!({ "column_id": source.id, "after": after_card_id }),
                );
                return Ok(card);
            }

            let mut target: Column = tx.get(target_id)?;
            if target.board_id != card.board_id {
                return Err(BoardError::invalid_reference(
                    target.id,
                    format!("column belongs to board {}, card to board {}", target.board_id, card.board_id),
                ));
            }
            source.sequence.remove(card.id);
            target.sequence.insert_after(card.id, after_card_id)?;
            source.updated_at = m.now;
            target.updated_at = m.now;
            tx.update(&source)?;
            tx.update(&target)?;

            card.column_id = target.id;
            card.updated_at = m.now;
            m.updated(EntityKind::Column, source.id, json!({ "sequence": source.sequence }));
            m.updated(EntityKind::Column, target.id, json!({ "sequence": target.sequence }));
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Moved,
                json!({ "column_id": source.id, "after": previous }),
                json!({ "column_id": target.id, "after": after_card_id }),
            );

            let mut fields = json!({ "column_id": target.id });
            if target.options.auto_close && !card.completed {
                complete_in(tx, m, &mut card)?;
                fields["completed"] = json!(true);
                fields["repeat"] = json!(card.repeat);
            }
            tx.update(&card)?;
            m.updated(EntityKind::Card, card.id, fields);

            if target.is_over_limit() {
                m.warn(format!(
                    "column {} holds {} cards, above its limit of {}",
                    target.id,
                    target.sequence.len(),
                    target.options.card_limit.unwrap_or_default()
                ));
            }
            Ok(card)
        })
    }

    /// Field-only edit; position and completion are untouched.
    pub fn update_card(
        &self,
        actor: Actor,
        card_id: i64,
        update: CardUpdate,
    ) -> Result<Outcome<Card>> {
        self.mutate(actor, "update_card", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            let mut diff = FieldDiff::default();
            diff.apply("title", &mut card.title, update.title)?;
            diff.apply("description", &mut card.description, update.description)?;
            diff.apply("due_date", &mut card.due_date, update.due_date)?;
            diff.apply("options", &mut card.options, update.options)?;
            diff.apply("repeat", &mut card.repeat, update.repeat)?;
            diff.apply("has_attachment", &mut card.has_attachment, update.has_attachment)?;
            if diff.is_empty() {
                return Ok(card);
            }
            card.updated_at = m.now;
            tx.update(&card)?;

            let (before, after) = diff.into_values();
            m.updated(EntityKind::Card, card.id, after.clone());
            m.log(card.board_id, EntityKind::Card, card.id, HistoryAction::Updated, before, after);
            Ok(card)
        })
    }

    /// Delete a card with its discussion and history.
    pub fn delete_card(&self, actor: Actor, card_id: i64) -> Result<Outcome<()>> {
        self.mutate(actor, "delete_card", |tx, m| {
            let card: Card = tx.get(card_id)?;
            let mut column: Column = tx.get(card.column_id)?;
            column.sequence.remove(card.id);
            column.updated_at = m.now;
            tx.update(&column)?;
            purge_card(tx, card.id)?;

            m.deleted(EntityKind::Card, card.id);
            m.updated(EntityKind::Column, column.id, json!({ "sequence": column.sequence }));
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Deleted,
                json!({ "title": card.title, "column_id": column.id }),
                Value::Null,
            );
            Ok(())
        })
    }

    /// Copy a card's fields into a new card placed after the original, or
    /// after `after_card_id` when given. Discussion and history stay behind.
    pub fn duplicate_card(
        &self,
        actor: Actor,
        card_id: i64,
        after_card_id: Option<i64>,
    ) -> Result<Outcome<Card>> {
        self.mutate(actor, "duplicate_card", |tx, m| {
            let card: Card = tx.get(card_id)?;
            let copy = Card {
                id: 0,
                has_discussion: false,
                has_attachment: false,
                created_by: m.actor.user_id,
                original_id: None,
                ..card.clone()
            };
            let copy = place_card(tx, m, &copy, card.column_id, after_card_id.unwrap_or(card.id))?;
            m.log(
                copy.board_id,
                EntityKind::Card,
                copy.id,
                HistoryAction::Duplicated,
                Value::Null,
                json!({ "source": card.id, "title": copy.title }),
            );
            Ok(copy)
        })
    }

    /// Copy a card to the top of the first column of every other
    /// non-template board in the same instance. Returns the copies.
    pub fn push_card(&self, actor: Actor, card_id: i64) -> Result<Outcome<Vec<Card>>> {
        self.mutate(actor, "push_card", |tx, m| {
            let card: Card = tx.get(card_id)?;
            let board: Board = tx.get(card.board_id)?;
            let mut copies = Vec::new();
            for target in tx.find_children::<Board>(board.instance)? {
                if target.id == board.id || target.owner == BoardOwner::Template {
                    continue;
                }
                let Some(column_id) = target.sequence.first() else {
                    m.warn(format!("board {} has no columns, card not pushed", target.id));
                    continue;
                };
                let copy = Card {
                    id: 0,
                    completed: false,
                    assignees: Vec::new(),
                    has_discussion: false,
                    has_attachment: false,
                    created_by: m.actor.user_id,
                    original_id: Some(card.id),
                    ..card.clone()
                };
                let copy = place_card(tx, m, &copy, column_id, HEAD)?;
                m.log(
                    copy.board_id,
                    EntityKind::Card,
                    copy.id,
                    HistoryAction::Pushed,
                    Value::Null,
                    json!({ "original_id": card.id, "title": copy.title }),
                );
                copies.push(copy);
            }
            tracing::debug!(card_id, copies = copies.len(), "Pushed card");
            Ok(copies)
        })
    }

    pub fn assign_user(&self, actor: Actor, card_id: i64, user_id: i64) -> Result<Outcome<Card>> {
        self.mutate(actor, "assign_user", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            if card.is_assigned(user_id) {
                return Ok(card);
            }
            card.assignees.push(user_id);
            card.updated_at = m.now;
            tx.update(&card)?;
            m.updated(EntityKind::Card, card.id, json!({ "assignees": card.assignees }));
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Assigned,
                Value::Null,
                json!({ "user_id": user_id }),
            );
            Ok(card)
        })
    }

    pub fn unassign_user(&self, actor: Actor, card_id: i64, user_id: i64) -> Result<Outcome<Card>> {
        self.mutate(actor, "unassign_user", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            if !card.is_assigned(user_id) {
                return Ok(card);
            }
            card.assignees.retain(|&id| id != user_id);
            card.updated_at = m.now;
            tx.update(&card)?;
            m.updated(EntityKind::Card, card.id, json!({ "assignees": card.assignees }));
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Unassigned,
                json!({ "user_id": user_id }),
                Value::Null,
            );
            Ok(card)
        })
    }

    /// Mark a card completed. A repeating card spawns its next occurrence.
    pub fn complete_card(&self, actor: Actor, card_id: i64) -> Result<Outcome<Card>> {
        self.mutate(actor, "complete_card", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            if card.completed {
                return Ok(card);
            }
            complete_in(tx, m, &mut card)?;
            card.updated_at = m.now;
            tx.update(&card)?;
            m.updated(
                EntityKind::Card,
                card.id,
                json!({ "completed": true, "repeat": card.repeat }),
            );
            Ok(card)
        })
    }

    pub fn uncomplete_card(&self, actor: Actor, card_id: i64) -> Result<Outcome<Card>> {
        self.mutate(actor, "uncomplete_card", |tx, m| {
            let mut card: Card = tx.get(card_id)?;
            if !card.completed {
                return Ok(card);
            }
            card.completed = false;
            card.updated_at = m.now;
            tx.update(&card)?;
            m.updated(EntityKind::Card, card.id, json!({ "completed": false }));
            m.log(
                card.board_id,
                EntityKind::Card,
                card.id,
                HistoryAction::Reopened,
                json!({ "completed": true }),
                json!({ "completed": false }),
            );
            Ok(card)
        })
    }
}
