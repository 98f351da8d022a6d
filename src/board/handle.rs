use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use kanban_common::ChangeEvent;
use tokio::sync::broadcast;

use super::changes::ChangeFeed;
use super::manager::BoardManager;
use crate::errors::{BoardError, Result};

/// Thread-safe handle for using a [`BoardManager`] from async code.
#[derive(Clone)]
pub struct ManagerHandle {
    inner: Arc<Mutex<BoardManager>>,
    feed: Option<ChangeFeed>,
}

impl ManagerHandle {
    pub fn new(manager: BoardManager) -> Self {
        let feed = manager.feed().cloned();
        Self {
            inner: Arc::new(Mutex::new(manager)),
            feed,
        }
    }

    /// Run a closure with the manager on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardManager) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let manager = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = manager
                .lock()
                .map_err(|e| anyhow::anyhow!("Manager lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("Manager task panicked")
        .map_err(BoardError::from)?
    }

    /// Acquire the manager synchronously. Only for startup code and tests,
    /// never from a hot async path.
    pub fn lock_sync(&self) -> Result<MutexGuard<'_, BoardManager>> {
        self.inner
            .lock()
            .map_err(|e| BoardError::from(anyhow::anyhow!("Manager lock poisoned: {}", e)))
    }

    /// Receiver for committed change batches, if the manager has a feed.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Vec<ChangeEvent>>> {
        self.feed.as_ref().map(ChangeFeed::subscribe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::db::BoardDb;
    use crate::board::manager::ManagerSettings;
    use kanban_common::*;

    fn handle() -> anyhow::Result<ManagerHandle> {
        let manager = BoardManager::new(BoardDb::new_in_memory()?, ManagerSettings::default())
            .with_feed(ChangeFeed::new(8));
        Ok(ManagerHandle::new(manager))
    }

    #[tokio::test]
    async fn test_call_runs_operations() -> anyhow::Result<()> {
        let handle = handle()?;
        let board_id = handle
            .call(|m| m.create_board(Actor::new(1), 1, BoardOwner::Course, None))
            .await?
            .value;
        let snapshot = handle.call(move |m| m.load_board(board_id)).await?;
        assert_eq!(snapshot.columns.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_errors_pass_through() -> anyhow::Result<()> {
        let handle = handle()?;
        let err = handle.call(|m| m.get_card(5)).await.unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_sees_committed_changes() -> anyhow::Result<()> {
        let handle = handle()?;
        let mut rx = handle.subscribe().expect("feed configured");
        handle
            .call(|m| m.create_board(Actor::new(1), 1, BoardOwner::Course, None))
            .await?;
        let batch = rx.recv().await?;
        assert_eq!(batch[0].kind, EntityKind::Board);
        assert!(handle.lock_sync()?.feed().is_some());
        Ok(())
    }
}
