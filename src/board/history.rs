use kanban_common::HistoryEntry;

use super::db::BoardDb;

/// Appends history entries after a structural commit.
///
/// Recording is best effort: the manager logs a failure and reports it as a
/// warning, the mutation itself stays committed.
pub trait HistoryRecorder: Send {
    fn record(&self, db: &BoardDb, entry: &HistoryEntry) -> anyhow::Result<()>;
}

/// Stores entries in the `kanban_history` table.
pub struct DbHistory;

impl HistoryRecorder for DbHistory {
    fn record(&self, db: &BoardDb, entry: &HistoryEntry) -> anyhow::Result<()> {
        let tx = db.transaction()?;
        tx.create(entry)?;
        tx.commit()?;
        Ok(())
    }
}

/// Drops every entry. Used when history is disabled in the configuration.
pub struct NoHistory;

impl HistoryRecorder for NoHistory {
    fn record(&self, _db: &BoardDb, _entry: &HistoryEntry) -> anyhow::Result<()> {
        Ok(())
    }
}
