//! Ordered, duplicate-free list of child identifiers.
//!
//! A board orders its columns and a column orders its cards with the same
//! [`Sequence`] type. The delimited string form (`"3,1,2"`) exists only at the
//! persistence boundary; everything else works on the list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference id meaning "at the head of the list".
pub const HEAD: i64 = 0;

/// Separator used by the persisted encoding.
pub const DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("reference {reference} is not part of the sequence")]
    InvalidReference { reference: i64 },

    #[error("{id} cannot be positioned relative to itself")]
    SelfReference { id: i64 },

    #[error("{id} is already part of the sequence")]
    DuplicateEntry { id: i64 },

    #[error("malformed sequence entry '{entry}'")]
    Malformed { entry: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct Sequence(Vec<i64>);

impl Sequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a sequence from ids, rejecting duplicates and non-positive ids.
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Result<Self, SequenceError> {
        let mut seq = Self::new();
        for id in ids {
            if id <= 0 {
                return Err(SequenceError::Malformed {
                    entry: id.to_string(),
                });
            }
            if seq.contains(id) {
                return Err(SequenceError::DuplicateEntry { id });
            }
            seq.0.push(id);
        }
        Ok(seq)
    }

    pub fn ids(&self) -> &[i64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.0.iter().position(|&x| x == id)
    }

    pub fn first(&self) -> Option<i64> {
        self.0.first().copied()
    }

    /// The id directly preceding `id`, or [`HEAD`] if `id` is first.
    pub fn predecessor(&self, id: i64) -> Option<i64> {
        match self.position(id)? {
            0 => Some(HEAD),
            pos => Some(self.0[pos - 1]),
        }
    }

    fn check_reference(&self, id: i64, after: i64) -> Result<(), SequenceError> {
        if after == id {
            return Err(SequenceError::SelfReference { id });
        }
        if after != HEAD && !self.contains(after) {
            return Err(SequenceError::InvalidReference { reference: after });
        }
        Ok(())
    }

    /// Insert `id` directly after `after` ([`HEAD`] inserts at the front).
    pub fn insert_after(&mut self, id: i64, after: i64) -> Result<(), SequenceError> {
        if self.contains(id) {
            return Err(SequenceError::DuplicateEntry { id });
        }
        self.check_reference(id, after)?;
        self.insert_unchecked(id, after);
        Ok(())
    }

    fn insert_unchecked(&mut self, id: i64, after: i64) {
        let index = match self.position(after) {
            Some(pos) => pos + 1,
            None => 0,
        };
        self.0.insert(index, id);
    }

    /// Remove `id`. Returns whether it was present.
    pub fn remove(&mut self, id: i64) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.0.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Reposition `id` directly after `after`.
    ///
    /// All validation happens before the list is touched, so on error the
    /// sequence is exactly as it was.
    pub fn move_after(&mut self, id: i64, after: i64) -> Result<(), SequenceError> {
        self.check_reference(id, after)?;
        self.remove(id);
        self.insert_unchecked(id, after);
        Ok(())
    }

    pub fn to_persisted(&self) -> String {
        let mut out = String::new();
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            out.push_str(&id.to_string());
        }
        out
    }

    pub fn from_persisted(raw: &str) -> Result<Self, SequenceError> {
        if raw.is_empty() {
            return Ok(Self::new());
        }
        let mut ids = Vec::new();
        for part in raw.split(DELIMITER) {
            let id = part.parse::<i64>().map_err(|_| SequenceError::Malformed {
                entry: part.to_string(),
            })?;
            ids.push(id);
        }
        Self::from_ids(ids)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_persisted())
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_persisted(s)
    }
}

impl TryFrom<Vec<i64>> for Sequence {
    type Error = SequenceError;

    fn try_from(ids: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_ids(ids)
    }
}

impl From<Sequence> for Vec<i64> {
    fn from(seq: Sequence) -> Self {
        seq.0
    }
}
