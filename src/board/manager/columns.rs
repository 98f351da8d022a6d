use kanban_common::*;
use serde_json::{Value, json};

use super::cards::purge_card;
use super::{BoardManager, FieldDiff, Outcome, new_column};
use crate::errors::Result;

impl BoardManager {
    /// Add a column after `after_column_id` (0 = first).
    pub fn add_column(
        &self,
        actor: Actor,
        board_id: i64,
        after_column_id: i64,
        draft: ColumnDraft,
    ) -> Result<Outcome<Column>> {
        self.mutate(actor, "add_column", |tx, m| {
            let mut board: Board = tx.get(board_id)?;
            let id = tx.create(&new_column(board.id, &draft.title, draft.options, m.now))?;
            board.sequence.insert_after(id, after_column_id)?;
            board.updated_at = m.now;
            tx.update(&board)?;

            let column: Column = tx.get(id)?;
            m.created(&column)?;
            m.updated(EntityKind::Board, board.id, json!({ "sequence": board.sequence }));
            m.log(
                board.id,
                EntityKind::Column,
                column.id,
                HistoryAction::Created,
                Value::Null,
                json!({ "title": column.title, "after": after_column_id }),
            );
            Ok(column)
        })
    }

    /// Reposition a column after `after_column_id` (0 = first) in its board.
    pub fn move_column(
        &self,
        actor: Actor,
        column_id: i64,
        after_column_id: i64,
    ) -> Result<Outcome<Column>> {
        self.mutate(actor, "move_column", |tx, m| {
            let column: Column = tx.get(column_id)?;
            let mut board: Board = tx.get(column.board_id)?;
            let previous = board.sequence.predecessor(column.id);
            let before = board.sequence.clone();
            board.sequence.move_after(column.id, after_column_id)?;
            if board.sequence == before {
                return Ok(column);
            }
            board.updated_at = m.now;
            tx.update(&board)?;

            m.updated(EntityKind::Board, board.id, json!({ "sequence": board.sequence }));
            m.log(
                board.id,
                EntityKind::Column,
                column.id,
                HistoryAction::Moved,
                json!({ "after": previous }),
                json!({ "after": after_column_id }),
            );
            Ok(column)
        })
    }

    /// Change title and/or options. Ordering is untouched.
    pub fn update_column(
        &self,
        actor: Actor,
        column_id: i64,
        update: ColumnUpdate,
    ) -> Result<Outcome<Column>> {
        self.mutate(actor, "update_column", |tx, m| {
            let mut column: Column = tx.get(column_id)?;
            let mut diff = FieldDiff::default();
            diff.apply("title", &mut column.title, update.title)?;
            diff.apply("options", &mut column.options, update.options)?;
            if diff.is_empty() {
                return Ok(column);
            }
            column.updated_at = m.now;
            tx.update(&column)?;

            let (before, after) = diff.into_values();
            m.updated(EntityKind::Column, column.id, after.clone());
            m.log(column.board_id, EntityKind::Column, column.id, HistoryAction::Updated, before, after);
            Ok(column)
        })
    }

    /// Delete a column and every card in it.
    pub fn delete_column(&self, actor: Actor, column_id: i64) -> Result<Outcome<()>> {
        self.mutate(actor, "delete_column", |tx, m| {
            let column: Column = tx.get(column_id)?;
            let mut board: Board = tx.get(column.board_id)?;

            let cards: Vec<Card> = tx.find_children(column.id)?;
            for card in &cards {
                purge_card(tx, card.id)?;
                m.deleted(EntityKind::Card, card.id);
            }
            board.sequence.remove(column.id);
            board.updated_at = m.now;
            tx.update(&board)?;
            tx.delete::<Column>(column.id)?;

            m.deleted(EntityKind::Column, column.id);
            m.updated(EntityKind::Board, board.id, json!({ "sequence": board.sequence }));
            m.log(
                board.id,
                EntityKind::Column,
                column.id,
                HistoryAction::Deleted,
                json!({ "title": column.title, "cards": cards.len() }),
                Value::Null,
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::errors::BoardError;
    use anyhow::Result;
    use kanban_common::*;

    #[test]
    fn test_add_column_at_head_and_after() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let ids = column_ids(&manager, board_id)?;
        assert_eq!(ids.len(), 3);

        let head = manager.add_column(actor(), board_id, HEAD, ColumnDraft::titled("Backlog"))?;
        let tail = manager.add_column(actor(), board_id, ids[2], ColumnDraft::titled("Archive"))?;

        let order = column_ids(&manager, board_id)?;
        assert_eq!(order, vec![head.value.id, ids[0], ids[1], ids[2], tail.value.id]);
        assert_eq!(head.value.title, "Backlog");
        assert!(manager.verify_board(board_id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_add_column_with_foreign_reference_persists_nothing() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let other = manager.create_board(actor(), 1, BoardOwner::User(9), None)?.value;
        let foreign = column_ids(&manager, other)?[0];

        let err = manager
            .add_column(actor(), board_id, foreign, ColumnDraft::titled("Nope"))
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidReference { .. }));

        let snapshot = manager.load_board(board_id)?;
        assert_eq!(snapshot.columns.len(), 3);
        assert!(snapshot.columns.iter().all(|c| c.column.title != "Nope"));
        Ok(())
    }

    #[test]
    fn test_move_column() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let ids = column_ids(&manager, board_id)?;

        manager.move_column(actor(), ids[2], HEAD)?;
        assert_eq!(column_ids(&manager, board_id)?, vec![ids[2], ids[0], ids[1]]);

        manager.move_column(actor(), ids[0], ids[1])?;
        assert_eq!(column_ids(&manager, board_id)?, vec![ids[2], ids[1], ids[0]]);
        Ok(())
    }

    #[test]
    fn test_move_column_onto_itself_is_rejected() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let ids = column_ids(&manager, board_id)?;
        let err = manager.move_column(actor(), ids[1], ids[1]).unwrap_err();
        assert!(matches!(err, BoardError::InvalidReference { .. }));
        assert_eq!(column_ids(&manager, board_id)?, ids);
        Ok(())
    }

    #[test]
    fn test_move_column_to_other_board_leaves_both_unchanged() -> Result<()> {
        let (manager, board_a) = manager_with_board()?;
        let board_b = manager.create_board(actor(), 1, BoardOwner::Group(4), None)?.value;
        let a = column_ids(&manager, board_a)?;
        let b = column_ids(&manager, board_b)?;

        let err = manager.move_column(actor(), a[0], b[1]).unwrap_err();
        assert!(matches!(err, BoardError::InvalidReference { reference, .. } if reference == b[1]));
        assert_eq!(column_ids(&manager, board_a)?, a);
        assert_eq!(column_ids(&manager, board_b)?, b);
        Ok(())
    }

    #[test]
    fn test_move_column_to_same_place_is_a_noop() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let ids = column_ids(&manager, board_id)?;
        let outcome = manager.move_column(actor(), ids[1], ids[0])?;
        assert!(outcome.changes.is_empty());
        assert!(manager.board_history(board_id)?.iter().all(|h| h.action != HistoryAction::Moved));
        Ok(())
    }

    #[test]
    fn test_update_column_reports_changed_fields_only() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let id = column_ids(&manager, board_id)?[0];

        let outcome = manager.update_column(
            actor(),
            id,
            ColumnUpdate {
                title: Some("Inbox".into()),
                options: None,
            },
        )?;
        assert_eq!(outcome.value.title, "Inbox");
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].fields, serde_json::json!({ "title": "Inbox" }));

        let again = manager.update_column(
            actor(),
            id,
            ColumnUpdate {
                title: Some("Inbox".into()),
                options: None,
            },
        )?;
        assert!(again.changes.is_empty());
        Ok(())
    }

    #[test]
    fn test_delete_column_cascades_and_keeps_order() -> Result<()> {
        let (manager, board_id) = manager_with_board()?;
        let ids = column_ids(&manager, board_id)?;
        let card = manager.add_card(actor(), ids[1], HEAD, CardDraft::titled("Doomed"))?.value;
        manager.add_discussion_message(actor(), card.id, "bye".into())?;

        manager.delete_column(actor(), ids[1])?;

        assert_eq!(column_ids(&manager, board_id)?, vec![ids[0], ids[2]]);
        assert!(matches!(manager.get_card(card.id), Err(BoardError::NotFound { .. })));
        assert!(matches!(manager.get_column(ids[1]), Err(BoardError::NotFound { .. })));
        assert!(manager.verify_board(board_id)?.is_empty());
        Ok(())
    }
}
