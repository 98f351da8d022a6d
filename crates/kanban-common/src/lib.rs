//! Shared domain types for the kanban board core.

pub mod events;
pub mod models;
pub mod sequence;

pub use events::{ChangeAction, ChangeEvent, HistoryAction, HistoryEntry};
pub use models::*;
pub use sequence::{HEAD, Sequence, SequenceError};
