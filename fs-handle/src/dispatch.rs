//! Fan-out of update events to subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use crate::entry::UpdateEvent;

/// Per-subscriber event buffer capacity.
///
/// When a subscriber falls this far behind, further events are dropped for
/// that subscriber (with a warning) rather than queued without bound or
/// allowed to back-pressure the watcher.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Identifies one subscription for later cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registered subscriber's receiving end.
///
/// Events arrive in the order the watcher produced them. Dropping the
/// subscription stops delivery; the registration is pruned on the next
/// dispatch.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<UpdateEvent>,
}

impl Subscription {
    /// The id to pass to `unsubscribe`.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next event, or `None` once the subscription is
    /// cancelled and the buffer is drained.
    pub async fn recv(&mut self) -> Option<UpdateEvent> {
        self.receiver.recv().await
    }
}

/// Delivers each produced event to every registered subscriber.
///
/// Each subscriber gets its own bounded channel, so a slow or abandoned
/// subscriber cannot stall the watcher or the other subscribers, and a
/// subscriber-side panic cannot reach the watcher at all.
#[derive(Debug)]
pub struct EventDispatcher {
    /// Live subscriber channels by id.
    subscribers: RwLock<HashMap<SubscriptionId, mpsc::Sender<UpdateEvent>>>,

    /// Source of subscription ids.
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create a dispatcher with no subscribers.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Register a new subscriber.
    pub async fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);

        self.subscribers.write().await.insert(id, sender);
        debug!("registered subscriber {id:?}");

        Subscription { id, receiver }
    }

    /// Remove a subscriber. Events already buffered on its channel can
    /// still be drained; nothing further is delivered.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("removed subscriber {id:?}");
        }
    }

    /// Remove every subscriber, closing their channels.
    ///
    /// Pending buffered events can still be drained; afterwards each
    /// subscription's `recv` resolves to `None`.
    pub async fn clear(&self) {
        let mut subscribers = self.subscribers.write().await;
        if !subscribers.is_empty() {
            debug!("clearing {} subscribers", subscribers.len());
            subscribers.clear();
        }
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver `event` to every live subscriber.
    ///
    /// Never blocks: a full subscriber buffer drops the event for that
    /// subscriber only. Subscribers whose receiving end has been dropped
    /// are pruned here.
    pub async fn dispatch(&self, event: UpdateEvent) {
        let mut stale = Vec::new();

        {
            let subscribers = self.subscribers.read().await;
            for (id, sender) in subscribers.iter() {
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("subscriber {id:?} buffer full, dropping {:?}", event.kind);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        stale.push(*id);
                    }
                }
            }
        }

        if !stale.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in stale {
                subscribers.remove(&id);
                debug!("pruned dropped subscriber {id:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::UpdateKind;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn event(name: &str, kind: UpdateKind) -> UpdateEvent {
        UpdateEvent {
            name: name.to_string(),
            kind,
            is_directory: Some(false),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_all_subscribers() {
        let dispatcher = EventDispatcher::new();
        let mut first = dispatcher.subscribe().await;
        let mut second = dispatcher.subscribe().await;

        dispatcher.dispatch(event("a.txt", UpdateKind::Create)).await;

        assert_eq!(first.recv().await.unwrap().name, "a.txt");
        assert_eq!(second.recv().await.unwrap().name, "a.txt");
    }

    #[tokio::test]
    async fn test_events_arrive_in_production_order() {
        let dispatcher = EventDispatcher::new();
        let mut sub = dispatcher.subscribe().await;

        dispatcher.dispatch(event("1", UpdateKind::Create)).await;
        dispatcher.dispatch(event("2", UpdateKind::Modify)).await;
        dispatcher.dispatch(event("3", UpdateKind::Delete)).await;

        assert_eq!(sub.recv().await.unwrap().name, "1");
        assert_eq!(sub.recv().await.unwrap().name, "2");
        assert_eq!(sub.recv().await.unwrap().name, "3");
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let dispatcher = EventDispatcher::new();
        let mut sub = dispatcher.subscribe().await;

        dispatcher.unsubscribe(sub.id()).await;
        dispatcher.dispatch(event("late", UpdateKind::Create)).await;

        // Channel is closed and empty: recv resolves to None.
        assert!(sub.recv().await.is_none());
        assert_eq!(dispatcher.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_subscriber_buffer_drops_without_blocking() {
        let dispatcher = EventDispatcher::new();
        let mut slow = dispatcher.subscribe().await;

        // Overfill the buffer; dispatch must complete without blocking.
        for i in 0..SUBSCRIBER_BUFFER + 10 {
            dispatcher
                .dispatch(event(&format!("{i}"), UpdateKind::Modify))
                .await;
        }

        // The subscriber kept exactly its buffer's worth, oldest first.
        for i in 0..SUBSCRIBER_BUFFER {
            assert_eq!(slow.recv().await.unwrap().name, format!("{i}"));
        }
        assert_eq!(dispatcher.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_closes_all_subscriptions() {
        let dispatcher = EventDispatcher::new();
        let mut first = dispatcher.subscribe().await;
        let mut second = dispatcher.subscribe().await;

        dispatcher.dispatch(event("last", UpdateKind::Create)).await;
        dispatcher.clear().await;

        // Buffered events drain, then the channels report closed.
        assert_eq!(first.recv().await.unwrap().name, "last");
        assert!(first.recv().await.is_none());
        assert_eq!(second.recv().await.unwrap().name, "last");
        assert!(second.recv().await.is_none());
        assert_eq!(dispatcher.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let dispatcher = EventDispatcher::new();
        let sub = dispatcher.subscribe().await;
        drop(sub);

        dispatcher.dispatch(event("x", UpdateKind::Create)).await;
        assert_eq!(dispatcher.subscriber_count().await, 0);
    }
}
