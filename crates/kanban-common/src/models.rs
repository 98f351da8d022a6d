use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::sequence::Sequence;

/// The kinds of rows the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Board,
    Column,
    Card,
    Discussion,
    History,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Column => "column",
            Self::Card => "card",
            Self::Discussion => "discussion",
            Self::History => "history",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "board" => Ok(Self::Board),
            "column" => Ok(Self::Column),
            "card" => Ok(Self::Card),
            "discussion" => Ok(Self::Discussion),
            "history" => Ok(Self::History),
            _ => Err(format!("Invalid entity kind: {}", s)),
        }
    }
}

/// An already-authorized user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
}

impl Actor {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }

    /// Actor used for maintenance work not triggered by a user.
    pub fn system() -> Self {
        Self { user_id: 0 }
    }
}

// ── Board ─────────────────────────────────────────────────────────────

/// Who a board belongs to inside a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BoardOwner {
    /// The shared board of the instance.
    Course,
    User(i64),
    Group(i64),
    Template,
}

impl BoardOwner {
    /// Row representation: (userid, groupid, template).
    pub fn to_columns(&self) -> (i64, i64, bool) {
        match *self {
            Self::Course => (0, 0, false),
            Self::User(id) => (id, 0, false),
            Self::Group(id) => (0, id, false),
            Self::Template => (0, 0, true),
        }
    }

    pub fn from_columns(user_id: i64, group_id: i64, template: bool) -> Self {
        if template {
            Self::Template
        } else if user_id != 0 {
            Self::User(user_id)
        } else if group_id != 0 {
            Self::Group(group_id)
        } else {
            Self::Course
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardOptions {
    /// Show per-board card numbers.
    #[serde(default)]
    pub use_numbers: bool,
    /// Record history entries for this board.
    #[serde(default = "default_true")]
    pub history: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            use_numbers: false,
            history: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub instance: i64,
    pub owner: BoardOwner,
    pub sequence: Sequence,
    pub options: BoardOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Column ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOptions {
    /// Advisory work-in-progress limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_limit: Option<u32>,
    /// Cards entering this column are marked completed.
    #[serde(default)]
    pub auto_close: bool,
    /// Completed cards in this column are hidden by the UI.
    #[serde(default)]
    pub auto_hide: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub sequence: Sequence,
    pub options: ColumnOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Column {
    pub fn is_over_limit(&self) -> bool {
        match self.options.card_limit {
            Some(limit) if limit > 0 => self.sequence.len() > limit as usize,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDraft {
    pub title: String,
    #[serde(default)]
    pub options: ColumnOptions,
}

impl ColumnDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            options: ColumnOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub title: Option<String>,
    pub options: Option<ColumnOptions>,
}

// ── Card ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatUnit {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl RepeatUnit {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Day => 0,
            Self::Week => 1,
            Self::Month => 2,
            Self::Year => 3,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self, String> {
        match value {
            0 => Ok(Self::Day),
            1 => Ok(Self::Week),
            2 => Ok(Self::Month),
            3 => Ok(Self::Year),
            _ => Err(format!("Invalid repeat interval type: {}", value)),
        }
    }
}

/// What the next due date of a repeated card is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatBase {
    #[default]
    DueDate,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub enabled: bool,
    pub interval: u32,
    pub unit: RepeatUnit,
    pub base: RepeatBase,
}

impl Default for RepeatRule {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 1,
            unit: RepeatUnit::Day,
            base: RepeatBase::DueDate,
        }
    }
}

impl RepeatRule {
    /// Due date of the next occurrence, `None` when the rule does not apply.
    pub fn next_due_date(
        &self,
        due_date: Option<DateTime<Utc>>,
        completed_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.enabled {
            return None;
        }
        let from = match self.base {
            RepeatBase::DueDate => due_date.unwrap_or(completed_at),
            RepeatBase::Completion => completed_at,
        };
        let n = self.interval.max(1);
        match self.unit {
            RepeatUnit::Day => from.checked_add_signed(Duration::days(i64::from(n))),
            RepeatUnit::Week => from.checked_add_signed(Duration::weeks(i64::from(n))),
            RepeatUnit::Month => from.checked_add_months(Months::new(n)),
            RepeatUnit::Year => from.checked_add_months(Months::new(n.saturating_mul(12))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub number: i64,
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub assignees: Vec<i64>,
    pub has_discussion: bool,
    pub has_attachment: bool,
    pub options: CardOptions,
    pub repeat: RepeatRule,
    pub created_by: i64,
    pub original_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn is_assigned(&self, user_id: i64) -> bool {
        self.assignees.contains(&user_id)
    }
}

/// Field values supplied when creating a card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<i64>,
    #[serde(default)]
    pub options: CardOptions,
    #[serde(default)]
    pub repeat: RepeatRule,
}

impl CardDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Field-only card edit. `None` leaves a field untouched; `due_date:
/// Some(None)` clears the due date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub options: Option<CardOptions>,
    pub repeat: Option<RepeatRule>,
    pub has_attachment: Option<bool>,
}

// ── Discussion ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionMessage {
    pub id: i64,
    pub card_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ── Views ─────────────────────────────────────────────────────────────

/// A board with its columns and cards in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board: Board,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub column: Column,
    pub cards: Vec<Card>,
}

impl BoardSnapshot {
    pub fn column(&self, id: i64) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.column.id == id)
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn board_owner_column_round_trip() {
        for owner in [
            BoardOwner::Course,
            BoardOwner::User(7),
            BoardOwner::Group(3),
            BoardOwner::Template,
        ] {
            let (u, g, t) = owner.to_columns();
            assert_eq!(BoardOwner::from_columns(u, g, t), owner);
        }
    }

    #[test]
    fn entity_kind_parses() {
        assert_eq!("card".parse::<EntityKind>().unwrap(), EntityKind::Card);
        assert!("lane".parse::<EntityKind>().is_err());
    }

    #[test]
    fn repeat_disabled_yields_nothing() {
        let rule = RepeatRule::default();
        assert_eq!(rule.next_due_date(Some(at(2024, 1, 1)), at(2024, 1, 2)), None);
    }

    #[test]
    fn repeat_from_due_date() {
        let rule = RepeatRule {
            enabled: true,
            interval: 2,
            unit: RepeatUnit::Week,
            base: RepeatBase::DueDate,
        };
        assert_eq!(
            rule.next_due_date(Some(at(2024, 1, 1)), at(2024, 3, 1)),
            Some(at(2024, 1, 15))
        );
    }

    #[test]
    fn repeat_from_completion_in_months() {
        let rule = RepeatRule {
            enabled: true,
            interval: 1,
            unit: RepeatUnit::Month,
            base: RepeatBase::Completion,
        };
        assert_eq!(
            rule.next_due_date(Some(at(2024, 1, 1)), at(2024, 1, 31)),
            Some(at(2024, 2, 29))
        );
    }

    #[test]
    fn repeat_unit_codes() {
        for unit in [RepeatUnit::Day, RepeatUnit::Week, RepeatUnit::Month, RepeatUnit::Year] {
            assert_eq!(RepeatUnit::from_i64(unit.as_i64()).unwrap(), unit);
        }
        assert!(RepeatUnit::from_i64(9).is_err());
    }

    #[test]
    fn column_limit_is_advisory() {
        let mut column = Column {
            id: 1,
            board_id: 1,
            title: "Doing".into(),
            sequence: Sequence::from_ids([1, 2, 3]).unwrap(),
            options: ColumnOptions {
                card_limit: Some(2),
                ..ColumnOptions::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(column.is_over_limit());
        column.options.card_limit = Some(0);
        assert!(!column.is_over_limit());
    }
}
