//! Typed errors for the board core.
//!
//! `NotFound`, `InvalidReference` and `DuplicateEntry` are caller errors and
//! are always raised before a transaction commits. `PersistenceFailure` wraps
//! whatever the store reported and is the only retryable kind.

use kanban_common::{EntityKind, SequenceError};
use thiserror::Error;

pub type Result<T, E = BoardError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Invalid reference {reference}: {reason}")]
    InvalidReference { reference: i64, reason: String },

    #[error("{id} is already present in the sequence")]
    DuplicateEntry { id: i64 },

    #[error("Persistence failure: {0:#}")]
    PersistenceFailure(#[from] anyhow::Error),
}

impl BoardError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn invalid_reference(reference: i64, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference,
            reason: reason.into(),
        }
    }

    /// String identifier the UI layer can translate.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "error:notfound",
            Self::InvalidReference { .. } => "error:invalidreference",
            Self::DuplicateEntry { .. } => "error:duplicateentry",
            Self::PersistenceFailure(_) => "error:persistencefailure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

impl From<SequenceError> for BoardError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::InvalidReference { reference } => {
                Self::invalid_reference(reference, "not part of the addressed parent")
            }
            SequenceError::SelfReference { id } => {
                Self::invalid_reference(id, "cannot be positioned relative to itself")
            }
            SequenceError::DuplicateEntry { id } => Self::DuplicateEntry { id },
            SequenceError::Malformed { entry } => {
                Self::PersistenceFailure(anyhow::anyhow!("Corrupt stored sequence entry '{}'", entry))
            }
        }
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        Self::PersistenceFailure(err.into())
    }
}
