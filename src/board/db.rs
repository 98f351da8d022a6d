use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use kanban_common::*;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, params_from_iter};
use serde::Serialize;

use crate::errors::{BoardError, Result};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ── Entity mapping ────────────────────────────────────────────────────

/// A row type the store can read and write generically.
///
/// `FIELDS` lists the stored columns after `id`; `values()` must produce them
/// in the same order and `from_row` reads them back from index 1 onwards.
pub trait Entity: Sized + Serialize {
    const KIND: EntityKind;
    const TABLE: &'static str;
    const FIELDS: &'static [&'static str];
    /// Column referencing the owning row.
    const PARENT: &'static str;

    fn id(&self) -> i64;
    fn values(&self) -> anyhow::Result<Vec<Value>>;
    fn from_row(row: &Row<'_>) -> anyhow::Result<Self>;
}

fn int(v: i64) -> Value {
    Value::Integer(v)
}

fn flag(v: bool) -> Value {
    Value::Integer(i64::from(v))
}

fn text(v: &str) -> Value {
    Value::Text(v.to_string())
}

fn json<T: Serialize>(v: &T) -> anyhow::Result<Value> {
    Ok(Value::Text(serde_json::to_string(v).context("Failed to encode JSON column")?))
}

fn time(v: DateTime<Utc>) -> Value {
    Value::Integer(v.timestamp())
}

fn read_time(row: &Row<'_>, idx: usize) -> anyhow::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).with_context(|| format!("Timestamp {} out of range", secs))
}

fn read_sequence(row: &Row<'_>, idx: usize) -> anyhow::Result<Sequence> {
    let raw: String = row.get(idx)?;
    Sequence::from_persisted(&raw).with_context(|| format!("Failed to parse sequence '{}'", raw))
}

fn read_json<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> anyhow::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON column '{}'", raw))
}

impl Entity for Board {
    const KIND: EntityKind = EntityKind::Board;
    const TABLE: &'static str = "kanban_board";
    const FIELDS: &'static [&'static str] = &[
        "kanban_instance",
        "userid",
        "groupid",
        "template",
        "sequence",
        "options",
        "timecreated",
        "timemodified",
    ];
    const PARENT: &'static str = "kanban_instance";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> anyhow::Result<Vec<Value>> {
        let (user_id, group_id, template) = self.owner.to_columns();
        Ok(vec![
            int(self.instance),
            int(user_id),
            int(group_id),
            flag(template),
            Value::Text(self.sequence.to_persisted()),
            json(&self.options)?,
            time(self.created_at),
            time(self.updated_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> anyhow::Result<Self> {
        Ok(Board {
            id: row.get(0)?,
            instance: row.get(1)?,
            owner: BoardOwner::from_columns(row.get(2)?, row.get(3)?, row.get(4)?),
            sequence: read_sequence(row, 5)?,
            options: read_json(row, 6)?,
            created_at: read_time(row, 7)?,
            updated_at: read_time(row, 8)?,
        })
    }
}

impl Entity for Column {
    const KIND: EntityKind = EntityKind::Column;
    const TABLE: &'static str = "kanban_column";
    const FIELDS: &'static [&'static str] = &[
        "kanban_board",
        "title",
        "sequence",
        "options",
        "timecreated",
        "timemodified",
    ];
    const PARENT: &'static str = "kanban_board";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> anyhow::Result<Vec<Value>> {
        Ok(vec![
            int(self.board_id),
            text(&self.title),
            Value::Text(self.sequence.to_persisted()),
            json(&self.options)?,
            time(self.created_at),
            time(self.updated_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> anyhow::Result<Self> {
        Ok(Column {
            id: row.get(0)?,
            board_id: row.get(1)?,
            title: row.get(2)?,
            sequence: read_sequence(row, 3)?,
            options: read_json(row, 4)?,
            created_at: read_time(row, 5)?,
            updated_at: read_time(row, 6)?,
        })
    }
}

impl Entity for Card {
    const KIND: EntityKind = EntityKind::Card;
    const TABLE: &'static str = "kanban_card";
    const FIELDS: &'static [&'static str] = &[
        "number",
        "kanban_board",
        "kanban_column",
        "title",
        "description",
        "duedate",
        "completed",
        "assignees",
        "discussion",
        "hasattachment",
        "options",
        "repeat_enable",
        "repeat_interval",
        "repeat_interval_type",
        "repeat_newduedate",
        "createdby",
        "originalid",
        "timecreated",
        "timemodified",
    ];
    const PARENT: &'static str = "kanban_column";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> anyhow::Result<Vec<Value>> {
        Ok(vec![
            int(self.number),
            int(self.board_id),
            int(self.column_id),
            text(&self.title),
            text(&self.description),
            self.due_date.map(time).unwrap_or(Value::Null),
            flag(self.completed),
            json(&self.assignees)?,
            flag(self.has_discussion),
            flag(self.has_attachment),
            json(&self.options)?,
            flag(self.repeat.enabled),
            int(i64::from(self.repeat.interval)),
            int(self.repeat.unit.as_i64()),
            flag(self.repeat.base == RepeatBase::Completion),
            int(self.created_by),
            self.original_id.map(int).unwrap_or(Value::Null),
            time(self.created_at),
            time(self.updated_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> anyhow::Result<Self> {
        let due_date = match row.get::<_, Option<i64>>(6)? {
            Some(secs) => Some(
                DateTime::from_timestamp(secs, 0)
                    .with_context(|| format!("Due date {} out of range", secs))?,
            ),
            None => None,
        };
        let interval: i64 = row.get(13)?;
        let unit = RepeatUnit::from_i64(row.get(14)?)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse repeat interval type")?;
        let base = if row.get::<_, bool>(15)? {
            RepeatBase::Completion
        } else {
            RepeatBase::DueDate
        };
        Ok(Card {
            id: row.get(0)?,
            number: row.get(1)?,
            board_id: row.get(2)?,
            column_id: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            due_date,
            completed: row.get(7)?,
            assignees: read_json(row, 8)?,
            has_discussion: row.get(9)?,
            has_attachment: row.get(10)?,
            options: read_json(row, 11)?,
            repeat: RepeatRule {
                enabled: row.get(12)?,
                interval: u32::try_from(interval).context("Invalid repeat interval")?,
                unit,
                base,
            },
            created_by: row.get(16)?,
            original_id: row.get(17)?,
            created_at: read_time(row, 18)?,
            updated_at: read_time(row, 19)?,
        })
    }
}

impl Entity for DiscussionMessage {
    const KIND: EntityKind = EntityKind::Discussion;
    const TABLE: &'static str = "kanban_discussion_comment";
    const FIELDS: &'static [&'static str] = &["kanban_card", "userid", "content", "timecreated"];
    const PARENT: &'static str = "kanban_card";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> anyhow::Result<Vec<Value>> {
        Ok(vec![
            int(self.card_id),
            int(self.user_id),
            text(&self.content),
            time(self.created_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> anyhow::Result<Self> {
        Ok(DiscussionMessage {
            id: row.get(0)?,
            card_id: row.get(1)?,
            user_id: row.get(2)?,
            content: row.get(3)?,
            created_at: read_time(row, 4)?,
        })
    }
}

impl Entity for HistoryEntry {
    const KIND: EntityKind = EntityKind::History;
    const TABLE: &'static str = "kanban_history";
    const FIELDS: &'static [&'static str] = &[
        "kanban_board",
        "entitytype",
        "entityid",
        "actiontype",
        "userid",
        "oldvalue",
        "newvalue",
        "timecreated",
    ];
    const PARENT: &'static str = "kanban_board";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> anyhow::Result<Vec<Value>> {
        Ok(vec![
            int(self.board_id),
            text(self.kind.as_str()),
            int(self.entity_id),
            text(self.action.as_str()),
            int(self.actor_id),
            json(&self.before)?,
            json(&self.after)?,
            time(self.timestamp),
        ])
    }

    fn from_row(row: &Row<'_>) -> anyhow::Result<Self> {
        let kind: String = row.get(2)?;
        let action: String = row.get(4)?;
        Ok(HistoryEntry {
            id: row.get(0)?,
            board_id: row.get(1)?,
            kind: EntityKind::from_str(&kind)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to parse history entity type")?,
            entity_id: row.get(3)?,
            action: HistoryAction::from_str(&action)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to parse history action")?,
            actor_id: row.get(5)?,
            before: read_json(row, 6)?,
            after: read_json(row, 7)?,
            timestamp: read_time(row, 8)?,
        })
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT id, {} FROM {}", E::FIELDS.join(", "), E::TABLE)
}

fn insert_sql<E: Entity>() -> String {
    let placeholders: Vec<String> = (1..=E::FIELDS.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::FIELDS.join(", "),
        placeholders.join(", ")
    )
}

fn update_sql<E: Entity>() -> String {
    let assignments: Vec<String> = E::FIELDS
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = ?{}", f, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        E::TABLE,
        assignments.join(", "),
        E::FIELDS.len() + 1
    )
}

// ── Database ──────────────────────────────────────────────────────────

/// SQLite-backed entity store.
///
/// One `BoardDb` owns one connection. Concurrent writers each open their own
/// `BoardDb` on the same file; `transaction()` takes the write lock up front
/// so their sequence read-modify-write cycles serialize.
pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        conn.busy_timeout(busy_timeout)
            .context("Failed to set busy timeout")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("Failed to enable WAL journal")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS kanban_board (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    kanban_instance INTEGER NOT NULL,
                    userid INTEGER NOT NULL DEFAULT 0,
                    groupid INTEGER NOT NULL DEFAULT 0,
                    template INTEGER NOT NULL DEFAULT 0,
                    sequence TEXT NOT NULL DEFAULT '',
                    options TEXT NOT NULL DEFAULT '{}',
                    timecreated INTEGER NOT NULL,
                    timemodified INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kanban_column (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    kanban_board INTEGER NOT NULL REFERENCES kanban_board(id),
                    title TEXT NOT NULL,
                    sequence TEXT NOT NULL DEFAULT '',
                    options TEXT NOT NULL DEFAULT '{}',
                    timecreated INTEGER NOT NULL,
                    timemodified INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kanban_card (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    number INTEGER NOT NULL DEFAULT 0,
                    kanban_board INTEGER NOT NULL REFERENCES kanban_board(id),
                    kanban_column INTEGER NOT NULL REFERENCES kanban_column(id),
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    duedate INTEGER,
                    completed INTEGER NOT NULL DEFAULT 0,
                    assignees TEXT NOT NULL DEFAULT '[]',
                    discussion INTEGER NOT NULL DEFAULT 0,
                    hasattachment INTEGER NOT NULL DEFAULT 0,
                    options TEXT NOT NULL DEFAULT '{}',
                    createdby INTEGER NOT NULL DEFAULT 0,
                    originalid INTEGER,
                    timecreated INTEGER NOT NULL,
                    timemodified INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kanban_discussion_comment (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    kanban_card INTEGER NOT NULL REFERENCES kanban_card(id),
                    userid INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    timecreated INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kanban_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    kanban_board INTEGER NOT NULL,
                    entitytype TEXT NOT NULL,
                    entityid INTEGER NOT NULL,
                    actiontype TEXT NOT NULL,
                    userid INTEGER NOT NULL,
                    oldvalue TEXT NOT NULL DEFAULT 'null',
                    newvalue TEXT NOT NULL DEFAULT 'null',
                    timecreated INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_board_instance ON kanban_board(kanban_instance);
                CREATE INDEX IF NOT EXISTS idx_column_board ON kanban_column(kanban_board);
                CREATE INDEX IF NOT EXISTS idx_card_column ON kanban_card(kanban_column);
                CREATE INDEX IF NOT EXISTS idx_card_board ON kanban_card(kanban_board);
                CREATE INDEX IF NOT EXISTS idx_discussion_card ON kanban_discussion_comment(kanban_card);
                CREATE INDEX IF NOT EXISTS idx_history_entity ON kanban_history(entitytype, entityid);
                CREATE INDEX IF NOT EXISTS idx_history_board ON kanban_history(kanban_board);
                ",
            )
            .context("Failed to create tables")?;

        // Repeat-rule columns arrived after the first schema version.
        // Only "duplicate column" errors are ignored, anything else propagates.
        let repeat_columns = [
            ("repeat_enable", "INTEGER NOT NULL DEFAULT 0"),
            ("repeat_interval", "INTEGER NOT NULL DEFAULT 1"),
            ("repeat_interval_type", "INTEGER NOT NULL DEFAULT 0"),
            ("repeat_newduedate", "INTEGER NOT NULL DEFAULT 0"),
        ];
        for (name, definition) in repeat_columns {
            let sql = format!("ALTER TABLE kanban_card ADD COLUMN {} {}", name, definition);
            match self.conn.execute(&sql, []) {
                Ok(_) => {}
                Err(e) if e.to_string().contains("duplicate column") => {}
                Err(e) => {
                    return Err(anyhow::anyhow!("Failed to add {} column: {}", name, e));
                }
            }
        }

        Ok(())
    }

    /// Begin a write transaction. The write lock is acquired immediately.
    pub fn transaction(&self) -> Result<StoreTx<'_>> {
        // Callers hold `&self` behind a Mutex, so no other transaction is
        // open on this connection.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin write transaction")?;
        Ok(StoreTx { tx })
    }

    /// Begin a read transaction giving a consistent view of committed state.
    pub fn snapshot(&self) -> Result<StoreTx<'_>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)
            .context("Failed to begin read transaction")?;
        Ok(StoreTx { tx })
    }
}

// ── Transaction-scoped CRUD ───────────────────────────────────────────

/// All reads and writes happen through a `StoreTx`. Dropping it without
/// calling [`StoreTx::commit`] rolls everything back.
pub struct StoreTx<'a> {
    tx: Transaction<'a>,
}

impl StoreTx<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit transaction")?;
        Ok(())
    }

    pub fn find<E: Entity>(&self, id: i64) -> Result<Option<E>> {
        let sql = format!("{} WHERE id = ?1", select_sql::<E>());
        let mut stmt = self
            .tx
            .prepare_cached(&sql)
            .with_context(|| format!("Failed to prepare get {}", E::KIND))?;
        let mut rows = stmt
            .query(params![id])
            .with_context(|| format!("Failed to query {}", E::KIND))?;
        match rows.next().context("Failed to read row")? {
            Some(row) => Ok(Some(E::from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get<E: Entity>(&self, id: i64) -> Result<E> {
        self.find(id)?
            .ok_or_else(|| BoardError::not_found(E::KIND, id))
    }

    /// Insert a row; the `id` of `entity` is ignored. Returns the new id.
    pub fn create<E: Entity>(&self, entity: &E) -> Result<i64> {
        let values = entity.values()?;
        self.tx
            .prepare_cached(&insert_sql::<E>())
            .and_then(|mut stmt| stmt.execute(params_from_iter(values)))
            .with_context(|| format!("Failed to insert {}", E::KIND))?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Write all stored fields of an existing row.
    pub fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        let mut values = entity.values()?;
        values.push(int(entity.id()));
        let count = self
            .tx
            .prepare_cached(&update_sql::<E>())
            .and_then(|mut stmt| stmt.execute(params_from_iter(values)))
            .with_context(|| format!("Failed to update {} {}", E::KIND, entity.id()))?;
        if count == 0 {
            return Err(BoardError::not_found(E::KIND, entity.id()));
        }
        Ok(())
    }

    pub fn delete<E: Entity>(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);
        let count = self
            .tx
            .execute(&sql, params![id])
            .with_context(|| format!("Failed to delete {} {}", E::KIND, id))?;
        if count == 0 {
            return Err(BoardError::not_found(E::KIND, id));
        }
        Ok(())
    }

    /// All rows owned by `parent_id`, oldest first.
    pub fn find_children<E: Entity>(&self, parent_id: i64) -> Result<Vec<E>> {
        self.find_where::<E>(E::PARENT, parent_id)
    }

    pub fn delete_children<E: Entity>(&self, parent_id: i64) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE, E::PARENT);
        let count = self
            .tx
            .execute(&sql, params![parent_id])
            .with_context(|| format!("Failed to delete children of {} {}", E::KIND, parent_id))?;
        Ok(count)
    }

    /// Rows whose integer `column` equals `value`. `column` must be one of
    /// the entity's own field names.
    fn find_where<E: Entity>(&self, column: &str, value: i64) -> Result<Vec<E>> {
        debug_assert!(E::FIELDS.iter().any(|f| *f == column));
        let sql = format!("{} WHERE {} = ?1 ORDER BY id", select_sql::<E>(), column);
        let mut stmt = self
            .tx
            .prepare_cached(&sql)
            .with_context(|| format!("Failed to prepare list {}", E::KIND))?;
        let mut rows = stmt
            .query(params![value])
            .with_context(|| format!("Failed to query {}", E::KIND))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("Failed to read row")? {
            out.push(E::from_row(row)?);
        }
        Ok(out)
    }

    pub fn cards_of_board(&self, board_id: i64) -> Result<Vec<Card>> {
        self.find_where::<Card>("kanban_board", board_id)
    }

    pub fn delete_cards_of_board(&self, board_id: i64) -> Result<usize> {
        let count = self
            .tx
            .execute("DELETE FROM kanban_card WHERE kanban_board = ?1", params![board_id])
            .context("Failed to delete cards of board")?;
        Ok(count)
    }

    pub fn delete_discussion_of_board(&self, board_id: i64) -> Result<usize> {
        let count = self
            .tx
            .execute(
                "DELETE FROM kanban_discussion_comment
                 WHERE kanban_card IN (SELECT id FROM kanban_card WHERE kanban_board = ?1)",
                params![board_id],
            )
            .context("Failed to delete discussion of board")?;
        Ok(count)
    }

    /// Next per-board card number (1-based).
    pub fn next_card_number(&self, board_id: i64) -> Result<i64> {
        let next: i64 = self
            .tx
            .query_row(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM kanban_card WHERE kanban_board = ?1",
                params![board_id],
                |row| row.get(0),
            )
            .context("Failed to get next card number")?;
        Ok(next)
    }

    /// The template board of an instance, if any (the oldest one wins).
    pub fn template_of(&self, instance: i64) -> Result<Option<Board>> {
        let id: Option<i64> = self
            .tx
            .query_row(
                "SELECT id FROM kanban_board WHERE kanban_instance = ?1 AND template = 1
                 ORDER BY id LIMIT 1",
                params![instance],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up template board")?;
        match id {
            Some(id) => self.find(id),
            None => Ok(None),
        }
    }

    pub fn history_of(&self, kind: EntityKind, entity_id: i64) -> Result<Vec<HistoryEntry>> {
        let sql = format!(
            "{} WHERE entitytype = ?1 AND entityid = ?2 ORDER BY id",
            select_sql::<HistoryEntry>()
        );
        let mut stmt = self
            .tx
            .prepare_cached(&sql)
            .context("Failed to prepare history query")?;
        let mut rows = stmt
            .query(params![kind.as_str(), entity_id])
            .context("Failed to query history")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("Failed to read history row")? {
            out.push(HistoryEntry::from_row(row)?);
        }
        Ok(out)
    }

    pub fn delete_history_of(&self, kind: EntityKind, entity_id: i64) -> Result<usize> {
        let count = self
            .tx
            .execute(
                "DELETE FROM kanban_history WHERE entitytype = ?1 AND entityid = ?2",
                params![kind.as_str(), entity_id],
            )
            .context("Failed to delete history")?;
        Ok(count)
    }

    /// Raw persisted form of a sequence column, bypassing parsing.
    pub fn raw_sequence<E: Entity>(&self, id: i64) -> Result<String> {
        let sql = format!("SELECT sequence FROM {} WHERE id = ?1", E::TABLE);
        let raw: Option<String> = self
            .tx
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()
            .context("Failed to read raw sequence")?;
        raw.ok_or_else(|| BoardError::not_found(E::KIND, id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
