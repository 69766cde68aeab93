use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::OrderBy;
use crate::entity::RawDocument;

/// The full set of documents matching a subscription at one point in time.
pub type Snapshot = Vec<RawDocument>;

/// A live subscription to a collection.
///
/// Yields one [`Snapshot`] per change. Cancelling is idempotent, and dropping
/// the subscription cancels it, so a forgotten handle cannot keep a listener alive.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    token: CancellationToken,
}

impl Subscription {
    /// Wait for the next snapshot. Returns `None` once cancelled or once the
    /// store has gone away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            snapshot = self.receiver.recv() => snapshot,
        }
    }

    /// Take an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        if self.token.is_cancelled() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token that cancels this subscription from elsewhere, e.g. on view teardown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Debug)]
struct Subscriber {
    collection: String,
    order: Option<OrderBy>,
    sender: mpsc::UnboundedSender<Snapshot>,
    token: CancellationToken,
}

/// Live subscribers for one store, pruned lazily on publish.
#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    subscribers: Vec<Subscriber>,
}

impl SubscriberRegistry {
    /// Register a subscriber and hand it its initial snapshot.
    pub fn register(
        &mut self,
        collection: &str,
        order: Option<OrderBy>,
        initial: Snapshot,
    ) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        // The receiver is alive, so this send cannot fail.
        let _ = sender.send(initial);
        self.subscribers.push(Subscriber {
            collection: collection.to_string(),
            order,
            sender,
            token: token.clone(),
        });
        Subscription { receiver, token }
    }

    /// Deliver a fresh snapshot to every live subscriber of `collection`.
    /// `snapshot_for` builds the snapshot in the subscriber's requested order.
    pub fn publish<F>(&mut self, collection: &str, mut snapshot_for: F) -> usize
    where
        F: FnMut(Option<&OrderBy>) -> Snapshot,
    {
        self.prune();
        let mut delivered = 0;
        for sub in self
            .subscribers
            .iter()
            .filter(|s| s.collection == collection)
        {
            if sub.sender.send(snapshot_for(sub.order.as_ref())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn active_count(&mut self) -> usize {
        self.prune();
        self.subscribers.len()
    }

    fn prune(&mut self) {
        self.subscribers
            .retain(|s| !s.token.is_cancelled() && !s.sender.is_closed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(ids: &[&str]) -> Snapshot {
        ids.iter()
            .map(|id| RawDocument::new(*id, json!({})))
            .collect()
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let mut registry = SubscriberRegistry::default();
        let mut sub = registry.register("notes", None, snapshot(&["a"]));

        assert_eq!(sub.next().await.unwrap().len(), 1);

        registry.publish("notes", |_| snapshot(&["a", "b"]));
        assert_eq!(sub.next().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_collections_are_not_delivered() {
        let mut registry = SubscriberRegistry::default();
        let mut sub = registry.register("notes", None, snapshot(&[]));
        sub.try_next();

        let delivered = registry.publish("taskGroups", |_| snapshot(&["g1"]));
        assert_eq!(delivered, 0);
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_stops_delivery() {
        let mut registry = SubscriberRegistry::default();
        let mut sub = registry.register("notes", None, snapshot(&["a"]));

        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());
        assert!(sub.next().await.is_none());

        assert_eq!(registry.publish("notes", |_| snapshot(&["a"])), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let mut registry = SubscriberRegistry::default();
        let sub = registry.register("notes", None, snapshot(&[]));
        assert_eq!(registry.active_count(), 1);
        drop(sub);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshots_are_not_coalesced() {
        let mut registry = SubscriberRegistry::default();
        let mut sub = registry.register("notes", None, snapshot(&[]));
        sub.try_next();

        registry.publish("notes", |_| snapshot(&["a"]));
        registry.publish("notes", |_| snapshot(&["a", "b"]));

        assert_eq!(sub.next().await.unwrap().len(), 1);
        assert_eq!(sub.next().await.unwrap().len(), 2);
    }
}
