use kanban_common::BoardSnapshot;
use serde::Serialize;

/// Tabular board view handed to an external download formatter.
///
/// `header` holds the column titles in board order. Row `i` holds the title
/// of the `i`-th card of every column, or an empty string where a column has
/// fewer cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardExport {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl BoardExport {
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Self {
        let header = snapshot
            .columns
            .iter()
            .map(|c| c.column.title.clone())
            .collect();
        let depth = snapshot
            .columns
            .iter()
            .map(|c| c.cards.len())
            .max()
            .unwrap_or(0);
        let rows = (0..depth)
            .map(|i| {
                snapshot
                    .columns
                    .iter()
                    .map(|c| c.cards.get(i).map(|card| card.title.clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { header, rows }
    }
}
