//! Ledger change notifications

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// What kind of record changed. Subscribers refresh regardless of the value;
/// it is carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Client,
    Project,
    Transaction,
    Scheduled,
}

/// Signal published after a successful ledger write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChanged {
    pub owner_id: String,
    pub source: ChangeSource,
    pub at: DateTime<Utc>,
}

/// Fire-and-forget broadcast of ledger changes. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<LedgerChanged>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish without waiting; having no subscribers is not an error
    pub fn publish(&self, owner_id: &str, source: ChangeSource, at: DateTime<Utc>) {
        let delivered = self
            .sender
            .send(LedgerChanged {
                owner_id: owner_id.to_string(),
                source,
                at,
            })
            .unwrap_or(0);
        tracing::trace!(owner_id, ?source, delivered, "ledger changed");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
