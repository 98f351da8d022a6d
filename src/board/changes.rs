use kanban_common::ChangeEvent;
use tokio::sync::broadcast;

/// Default number of buffered batches before slow subscribers start lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of committed change events to any subscribed sync layer.
///
/// One message is one committed operation, so subscribers never see a
/// partial mutation.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Vec<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<ChangeEvent>> {
        self.tx.subscribe()
    }

    /// Send one operation's events. Empty batches and missing receivers are
    /// ignored.
    pub fn publish(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        if self.tx.send(events.to_vec()).is_err() {
            tracing::trace!(count = events.len(), "No change feed subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
