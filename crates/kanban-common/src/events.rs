//! History entries and change notifications.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    Moved,
    Deleted,
    Duplicated,
    Pushed,
    Completed,
    Reopened,
    Assigned,
    Unassigned,
    Commented,
    CommentDeleted,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
            Self::Duplicated => "duplicated",
            Self::Pushed => "pushed",
            Self::Completed => "completed",
            Self::Reopened => "reopened",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::Commented => "commented",
            Self::CommentDeleted => "comment_deleted",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "moved" => Ok(Self::Moved),
            "deleted" => Ok(Self::Deleted),
            "duplicated" => Ok(Self::Duplicated),
            "pushed" => Ok(Self::Pushed),
            "completed" => Ok(Self::Completed),
            "reopened" => Ok(Self::Reopened),
            "assigned" => Ok(Self::Assigned),
            "unassigned" => Ok(Self::Unassigned),
            "commented" => Ok(Self::Commented),
            "comment_deleted" => Ok(Self::CommentDeleted),
            _ => Err(format!("Invalid history action: {}", s)),
        }
    }
}

/// Immutable audit record of one committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub board_id: i64,
    pub kind: EntityKind,
    pub entity_id: i64,
    pub action: HistoryAction,
    pub actor_id: i64,
    pub before: Value,
    pub after: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// State change a client-side diffing layer needs to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub id: i64,
    pub action: ChangeAction,
    /// Full entity for `Created`, changed fields for `Updated`, null for
    /// `Deleted`.
    pub fields: Value,
}

impl ChangeEvent {
    pub fn created(kind: EntityKind, id: i64, fields: Value) -> Self {
        Self {
            kind,
            id,
            action: ChangeAction::Created,
            fields,
        }
    }

    pub fn updated(kind: EntityKind, id: i64, fields: Value) -> Self {
        Self {
            kind,
            id,
            action: ChangeAction::Updated,
            fields,
        }
    }

    pub fn deleted(kind: EntityKind, id: i64) -> Self {
        Self {
            kind,
            id,
            action: ChangeAction::Deleted,
            fields: Value::Null,
        }
    }
}
