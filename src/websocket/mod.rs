use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod message_types;
pub mod pubsub;

/// Unique identifier for a WebSocket subscriber
///
/// Each WebSocket connection gets a unique subscriber ID when it registers,
/// allowing precise cleanup when the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber entry with ID and channel
struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Process-local registry of open WebSocket connections.
///
/// There is a single implicit room, so the registry is a flat subscriber set.
/// The connection I/O path mutates it; the bus-listener task reads it when
/// fanning out, and delivery to each session crosses the task boundary through
/// that subscriber's unbounded channel. Outbound frames queue without bound on
/// a slow session.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Vec<Subscriber>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    ///
    /// Returns the subscriber ID (used for cleanup) and the receiver half of
    /// the connection's delivery channel.
    pub async fn add_subscriber(&self) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.push(Subscriber {
            id: subscriber_id,
            sender: tx,
        });

        tracing::debug!(
            "Added subscriber {:?}, total subscribers: {}",
            subscriber_id,
            guard.len()
        );

        (subscriber_id, rx)
    }

    /// Remove a connection from the registry.
    ///
    /// Idempotent: removing an ID that is already gone is a no-op. Must be
    /// called when a WebSocket connection closes.
    pub async fn remove_subscriber(&self, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|s| s.id != subscriber_id);

        if guard.len() != before {
            tracing::debug!(
                "Removed subscriber {:?}, remaining: {}",
                subscriber_id,
                guard.len()
            );
        }
    }

    /// Deliver an already-serialized payload to every registered connection.
    ///
    /// A failed send means the receiving session is gone; its entry is pruned
    /// and delivery continues to the rest. An empty registry is a no-op.
    pub async fn broadcast(&self, msg: String) {
        let mut guard = self.inner.write().await;
        let before = guard.len();

        guard.retain(|subscriber| subscriber.sender.send(msg.clone()).is_ok());

        if guard.len() != before {
            tracing::debug!(
                "Broadcast: {} dead senders cleaned up, {} active",
                before - guard.len(),
                guard.len()
            );
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
