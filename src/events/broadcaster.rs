use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Fan-out payload for progress activity pushed to interested parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNotice {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub progress: i32,
}

/// Fan-out for order activity pushed to connected marketplace clients.
///
/// Request handling never depends on delivery; publish failures are logged
/// at debug level and dropped.
#[async_trait]
pub trait NotificationBroadcaster: Send + Sync {
    async fn publish(&self, notice: ProgressNotice);
}

/// Broadcasts notices over a process-wide channel. Consumers (e.g. a
/// realtime fan-out task) attach via [`ChannelBroadcaster::subscribe`].
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<ProgressNotice>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressNotice> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl NotificationBroadcaster for ChannelBroadcaster {
    async fn publish(&self, notice: ProgressNotice) {
        // A send error only means no subscriber is currently attached.
        if let Err(e) = self.tx.send(notice) {
            debug!("No subscribers for progress notice: {}", e);
        }
    }
}

/// Discards every notice. Used where fan-out is irrelevant.
pub struct NoopBroadcaster;

#[async_trait]
impl NotificationBroadcaster for NoopBroadcaster {
    async fn publish(&self, _notice: ProgressNotice) {}
}
