//! Board Manager: every structural or field mutation of a board.
//!
//! Each operation runs validate → load → compute → commit inside one write
//! transaction, then records history and publishes change events. Caller
//! errors abort before commit, so nothing is persisted on failure.

mod cards;
mod columns;
mod discussion;

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, SubsecRound, Utc};
use kanban_common::*;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::changes::ChangeFeed;
use super::db::{BoardDb, Entity, StoreTx};
use super::export::BoardExport;
use super::history::{DbHistory, HistoryRecorder, NoHistory};
use crate::errors::Result;

/// Behaviour knobs the manager needs from the configuration.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Titles of the columns a new board starts with.
    pub default_columns: Vec<String>,
    /// Mark the last default column as auto-close.
    pub autoclose_last_column: bool,
    /// Enable card numbers on new boards.
    pub use_numbers: bool,
    pub history: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            default_columns: vec!["To do".into(), "Doing".into(), "Done".into()],
            autoclose_last_column: true,
            use_numbers: false,
            history: true,
        }
    }
}

/// Result of a committed mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    /// Change events in the order they happened.
    pub changes: Vec<ChangeEvent>,
    /// Non-fatal problems (failed history writes, exceeded card limits).
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            changes: self.changes,
            warnings: self.warnings,
        }
    }
}

/// Collects what a mutation did while its transaction is open.
struct Mutation {
    actor: Actor,
    now: DateTime<Utc>,
    changes: Vec<ChangeEvent>,
    history: Vec<HistoryEntry>,
    warnings: Vec<String>,
}

impl Mutation {
    fn new(actor: Actor) -> Self {
        Self {
            actor,
            // Rows store whole seconds.
            now: Utc::now().trunc_subsecs(0),
            changes: Vec::new(),
            history: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn created<E: Entity>(&mut self, entity: &E) -> Result<()> {
        self.changes
            .push(ChangeEvent::created(E::KIND, entity.id(), to_json(entity)?));
        Ok(())
    }

    fn updated(&mut self, kind: EntityKind, id: i64, fields: Value) {
        self.changes.push(ChangeEvent::updated(kind, id, fields));
    }

    fn deleted(&mut self, kind: EntityKind, id: i64) {
        self.changes.push(ChangeEvent::deleted(kind, id));
    }

    fn log(
        &mut self,
        board_id: i64,
        kind: EntityKind,
        entity_id: i64,
        action: HistoryAction,
        before: Value,
        after: Value,
    ) {
        self.history.push(HistoryEntry {
            id: 0,
            board_id,
            kind,
            entity_id,
            action,
            actor_id: self.actor.user_id,
            before,
            after,
            timestamp: self.now,
        });
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(%message, "Board mutation warning");
        self.warnings.push(message);
    }
}

/// Before/after maps of the fields an update actually changed.
#[derive(Default)]
struct FieldDiff {
    before: Map<String, Value>,
    after: Map<String, Value>,
}

impl FieldDiff {
    /// Overwrite `slot` with `value` when given and different.
    fn apply<T: PartialEq + Serialize>(
        &mut self,
        field: &str,
        slot: &mut T,
        value: Option<T>,
    ) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        if *slot == value {
            return Ok(());
        }
        self.before.insert(field.to_string(), to_json(slot)?);
        self.after.insert(field.to_string(), to_json(&value)?);
        *slot = value;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.after.is_empty()
    }

    fn into_values(self) -> (Value, Value) {
        (Value::Object(self.before), Value::Object(self.after))
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).context("Failed to serialize entity")?)
}

/// Load a board with its columns and cards in display order.
fn snapshot_of(tx: &StoreTx<'_>, board_id: i64) -> Result<BoardSnapshot> {
    let board: Board = tx.get(board_id)?;
    let mut columns = Vec::with_capacity(board.sequence.len());
    for column_id in board.sequence.iter() {
        let column: Column = tx.get(column_id)?;
        let mut cards = Vec::with_capacity(column.sequence.len());
        for card_id in column.sequence.iter() {
            cards.push(tx.get::<Card>(card_id)?);
        }
        columns.push(ColumnView { column, cards });
    }
    Ok(BoardSnapshot { board, columns })
}

fn new_column(board_id: i64, title: &str, options: ColumnOptions, now: DateTime<Utc>) -> Column {
    Column {
        id: 0,
        board_id,
        title: title.to_string(),
        sequence: Sequence::new(),
        options,
        created_at: now,
        updated_at: now,
    }
}

/// Create a board with default columns, or as a structural clone of `source`.
fn create_board_in(
    tx: &StoreTx<'_>,
    m: &mut Mutation,
    settings: &ManagerSettings,
    instance: i64,
    owner: BoardOwner,
    source: Option<i64>,
) -> Result<Board> {
    let source = match source {
        Some(id) => Some(snapshot_of(tx, id)?),
        None => None,
    };
    let options = match &source {
        Some(src) => src.board.options.clone(),
        None => BoardOptions {
            use_numbers: settings.use_numbers,
            history: true,
        },
    };
    let draft = Board {
        id: 0,
        instance,
        owner,
        sequence: Sequence::new(),
        options,
        created_at: m.now,
        updated_at: m.now,
    };
    let mut board: Board = tx.get(tx.create(&draft)?)?;

    let mut column_ids = Vec::new();
    let mut card_ids = Vec::new();
    match &source {
        Some(src) => {
            for view in &src.columns {
                let mut column =
                    new_column(board.id, &view.column.title, view.column.options.clone(), m.now);
                column.id = tx.create(&column)?;
                let mut after = HEAD;
                for card in &view.cards {
                    let copy = Card {
                        id: 0,
                        board_id: board.id,
                        column_id: column.id,
                        assignees: Vec::new(),
                        has_discussion: false,
                        has_attachment: false,
                        created_by: m.actor.user_id,
                        original_id: None,
                        created_at: m.now,
                        updated_at: m.now,
                        ..card.clone()
                    };
                    let card_id = tx.create(&copy)?;
                    column.sequence.insert_after(card_id, after)?;
                    after = card_id;
                    card_ids.push(card_id);
                }
                tx.update(&column)?;
                board.sequence.insert_after(column.id, column_ids.last().copied().unwrap_or(HEAD))?;
                column_ids.push(column.id);
            }
        }
        None => {
            let last = settings.default_columns.len().saturating_sub(1);
            for (i, title) in settings.default_columns.iter().enumerate() {
                let options = ColumnOptions {
                    auto_close: settings.autoclose_last_column && i == last,
                    ..ColumnOptions::default()
                };
                let column_id = tx.create(&new_column(board.id, title, options, m.now))?;
                board.sequence.insert_after(column_id, column_ids.last().copied().unwrap_or(HEAD))?;
                column_ids.push(column_id);
            }
        }
    }
    tx.update(&board)?;

    m.created(&board)?;
    for id in column_ids {
        m.created(&tx.get::<Column>(id)?)?;
    }
    for id in card_ids {
        m.created(&tx.get::<Card>(id)?)?;
    }
    m.log(
        board.id,
        EntityKind::Board,
        board.id,
        HistoryAction::Created,
        Value::Null,
        json!({
            "instance": instance,
            "owner": owner,
            "source": source.as_ref().map(|s| s.board.id),
        }),
    );
    tracing::info!(board_id = board.id, instance, ?owner, "Created board");
    Ok(board)
}

/// Owns the store and runs every board operation.
pub struct BoardManager {
    db: BoardDb,
    recorder: Box<dyn HistoryRecorder>,
    feed: Option<ChangeFeed>,
    settings: ManagerSettings,
}

impl BoardManager {
    pub fn new(db: BoardDb, settings: ManagerSettings) -> Self {
        let recorder: Box<dyn HistoryRecorder> = if settings.history {
            Box::new(DbHistory)
        } else {
            Box::new(NoHistory)
        };
        Self {
            db,
            recorder,
            feed: None,
            settings,
        }
    }

    pub fn with_recorder(mut self, recorder: impl HistoryRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn feed(&self) -> Option<&ChangeFeed> {
        self.feed.as_ref()
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn db(&self) -> &BoardDb {
        &self.db
    }

    /// Run `f` in a write transaction, then record history and publish.
    fn mutate<T>(
        &self,
        actor: Actor,
        operation: &'static str,
        f: impl FnOnce(&StoreTx<'_>, &mut Mutation) -> Result<T>,
    ) -> Result<Outcome<T>> {
        let mut m = Mutation::new(actor);
        let tx = self.db.transaction()?;
        let value = match f(&tx, &mut m) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(operation, actor = actor.user_id, error = %e, "Board mutation rejected");
                return Err(e);
            }
        };
        tx.commit()?;
        tracing::debug!(
            operation,
            actor = actor.user_id,
            changes = m.changes.len(),
            "Board mutation committed"
        );

        let Mutation {
            changes,
            history,
            mut warnings,
            ..
        } = m;
        self.record_history(history, &mut warnings);
        if let Some(feed) = &self.feed {
            feed.publish(&changes);
        }
        Ok(Outcome {
            value,
            changes,
            warnings,
        })
    }

    /// Best effort: failures become warnings, the commit stands.
    fn record_history(&self, entries: Vec<HistoryEntry>, warnings: &mut Vec<String>) {
        let mut enabled: HashMap<i64, bool> = HashMap::new();
        for entry in entries {
            let allowed = match enabled.get(&entry.board_id) {
                Some(allowed) => *allowed,
                None => {
                    let allowed = match self.board_records_history(entry.board_id) {
                        Ok(allowed) => allowed,
                        Err(e) => {
                            tracing::warn!(error = %e, board_id = entry.board_id, "Failed to read board history option");
                            warnings.push(format!(
                                "history not recorded for board {}: {}",
                                entry.board_id, e
                            ));
                            false
                        }
                    };
                    enabled.insert(entry.board_id, allowed);
                    allowed
                }
            };
            if !allowed {
                continue;
            }
            if let Err(e) = self.recorder.record(&self.db, &entry) {
                tracing::warn!(
                    error = %e,
                    kind = %entry.kind,
                    entity_id = entry.entity_id,
                    action = %entry.action,
                    "Failed to record history"
                );
                warnings.push(format!(
                    "history not recorded for {} {} ({}): {:#}",
                    entry.kind, entry.entity_id, entry.action, e
                ));
            }
        }
    }

    /// Deleted boards record nothing.
    fn board_records_history(&self, board_id: i64) -> Result<bool> {
        let tx = self.db.snapshot()?;
        Ok(tx
            .find::<Board>(board_id)?
            .map(|b| b.options.history)
            .unwrap_or(false))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreTx<'_>) -> Result<T>) -> Result<T> {
        let tx = self.db.snapshot()?;
        f(&tx)
    }

    // ── Boards ────────────────────────────────────────────────────────

    /// Create a board with the default columns, or clone the structure of
    /// `source` (columns and cards, not discussion or history).
    pub fn create_board(
        &self,
        actor: Actor,
        instance: i64,
        owner: BoardOwner,
        source: Option<i64>,
    ) -> Result<Outcome<i64>> {
        self.mutate(actor, "create_board", |tx, m| {
            let board = create_board_in(tx, m, &self.settings, instance, owner, source)?;
            Ok(board.id)
        })
    }

    /// The board of `owner` in `instance`, created on first access.
    ///
    /// New boards are cloned from the instance's template board when one
    /// exists.
    pub fn ensure_board(
        &self,
        actor: Actor,
        instance: i64,
        owner: BoardOwner,
    ) -> Result<Outcome<i64>> {
        self.mutate(actor, "ensure_board", |tx, m| {
            let existing = tx
                .find_children::<Board>(instance)?
                .into_iter()
                .find(|b| b.owner == owner);
            if let Some(board) = existing {
                return Ok(board.id);
            }
            let template = match owner {
                BoardOwner::Template => None,
                _ => tx.template_of(instance)?.map(|b| b.id),
            };
            let board = create_board_in(tx, m, &self.settings, instance, owner, template)?;
            Ok(board.id)
        })
    }

    /// Delete a board with its columns, cards, discussion and history.
    pub fn delete_board(&self, actor: Actor, board_id: i64) -> Result<Outcome<()>> {
        self.mutate(actor, "delete_board", |tx, m| {
            let board: Board = tx.get(board_id)?;
            let columns: Vec<Column> = tx.find_children(board.id)?;
            let cards = tx.cards_of_board(board.id)?;

            tx.delete_discussion_of_board(board.id)?;
            tx.delete_children::<HistoryEntry>(board.id)?;
            tx.delete_cards_of_board(board.id)?;
            tx.delete_children::<Column>(board.id)?;
            tx.delete::<Board>(board.id)?;

            for card in &cards {
                m.deleted(EntityKind::Card, card.id);
            }
            for column in &columns {
                m.deleted(EntityKind::Column, column.id);
            }
            m.deleted(EntityKind::Board, board.id);
            tracing::info!(
                board_id,
                columns = columns.len(),
                cards = cards.len(),
                "Deleted board"
            );
            Ok(())
        })
    }

    /// Change board options (card numbers, history recording).
    pub fn update_board_options(
        &self,
        actor: Actor,
        board_id: i64,
        options: BoardOptions,
    ) -> Result<Outcome<Board>> {
        self.mutate(actor, "update_board_options", |tx, m| {
            let mut board: Board = tx.get(board_id)?;
            let mut diff = FieldDiff::default();
            diff.apply("options", &mut board.options, Some(options))?;
            if diff.is_empty() {
                return Ok(board);
            }
            board.updated_at = m.now;
            tx.update(&board)?;
            let (before, after) = diff.into_values();
            m.updated(EntityKind::Board, board.id, after.clone());
            m.log(board.id, EntityKind::Board, board.id, HistoryAction::Updated, before, after);
            Ok(board)
        })
    }

    /// Read-only snapshot with columns and cards in display order.
    pub fn load_board(&self, board_id: i64) -> Result<BoardSnapshot> {
        self.read(|tx| snapshot_of(tx, board_id))
    }

    pub fn get_board(&self, board_id: i64) -> Result<Board> {
        self.read(|tx| tx.get(board_id))
    }

    pub fn get_column(&self, column_id: i64) -> Result<Column> {
        self.read(|tx| tx.get(column_id))
    }

    pub fn get_card(&self, card_id: i64) -> Result<Card> {
        self.read(|tx| tx.get(card_id))
    }

    pub fn export_board(&self, board_id: i64) -> Result<BoardExport> {
        Ok(BoardExport::from_snapshot(&self.load_board(board_id)?))
    }

    // ── History and overview ──────────────────────────────────────────

    pub fn card_history(&self, card_id: i64) -> Result<Vec<HistoryEntry>> {
        self.read(|tx| {
            tx.get::<Card>(card_id)?;
            tx.history_of(EntityKind::Card, card_id)
        })
    }

    pub fn board_history(&self, board_id: i64) -> Result<Vec<HistoryEntry>> {
        self.read(|tx| {
            tx.get::<Board>(board_id)?;
            tx.find_children::<HistoryEntry>(board_id)
        })
    }

    /// Open cards assigned to `user_id` on the non-template boards of an
    /// instance.
    pub fn uncompleted_assigned_cards(&self, instance: i64, user_id: i64) -> Result<Vec<Card>> {
        self.read(|tx| {
            let mut out = Vec::new();
            for board in tx.find_children::<Board>(instance)? {
                if board.owner == BoardOwner::Template {
                    continue;
                }
                out.extend(
                    tx.cards_of_board(board.id)?
                        .into_iter()
                        .filter(|c| !c.completed && c.is_assigned(user_id)),
                );
            }
            Ok(out)
        })
    }

    /// Every ownership/order inconsistency of a board; empty when healthy.
    pub fn verify_board(&self, board_id: i64) -> Result<Vec<String>> {
        self.read(|tx| {
            let board: Board = tx.get(board_id)?;
            let mut problems = Vec::new();

            for column_id in board.sequence.iter() {
                match tx.find::<Column>(column_id)? {
                    None => problems.push(format!("board {} lists missing column {}", board.id, column_id)),
                    Some(c) if c.board_id != board.id => problems.push(format!(
                        "board {} lists column {} owned by board {}",
                        board.id, column_id, c.board_id
                    )),
                    Some(_) => {}
                }
            }

            for column in tx.find_children::<Column>(board.id)? {
                if !board.sequence.contains(column.id) {
                    problems.push(format!("column {} is missing from board {} sequence", column.id, board.id));
                }
                for card_id in column.sequence.iter() {
                    match tx.find::<Card>(card_id)? {
                        None => problems.push(format!("column {} lists missing card {}", column.id, card_id)),
                        Some(card) if card.column_id != column.id => problems.push(format!(
                            "column {} lists card {} owned by column {}",
                            column.id, card_id, card.column_id
                        )),
                        Some(card) if card.board_id != board.id => problems.push(format!(
                            "card {} in column {} belongs to board {}",
                            card_id, column.id, card.board_id
                        )),
                        Some(_) => {}
                    }
                }
                for card in tx.find_children::<Card>(column.id)? {
                    if !column.sequence.contains(card.id) {
                        problems.push(format!("card {} is missing from column {} sequence", card.id, column.id));
                    }
                }
            }

            Ok(problems)
        })
    }
}
