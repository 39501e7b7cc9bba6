use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

#[derive(Debug)]
struct HubShared<T> {
    registry: Mutex<BTreeMap<u64, mpsc::Sender<Arc<T>>>>,
    next_subscriber_id: AtomicU64,
    closed: AtomicBool,
}

#[derive(Debug)]
pub struct BroadcastHub<T> {
    shared: Arc<HubShared<T>>,
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for BroadcastHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BroadcastHub<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HubShared {
                registry: Mutex::new(BTreeMap::new()),
                next_subscriber_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn subscribe(&self, capacity: usize) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let subscriber_id = self.shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        if self.shared.closed.load(Ordering::Acquire) {
            // Closed hub: the sender is dropped here, so the subscription
            // observes immediate end-of-stream.
            return Subscription {
                subscriber_id,
                receiver,
                shared: Weak::new(),
            };
        }
        self.shared
            .registry
            .lock()
            .expect("subscriber registry lock poisoned")
            .insert(subscriber_id, sender);
        Subscription {
            subscriber_id,
            receiver,
            shared: Arc::downgrade(&self.shared),
        }
    }

    // Suspends until the record has been accepted into every queue that
    // was registered when the call started. A subscriber whose receiver
    // has gone away is pruned instead of awaited, so one departed
    // subscriber can never stall the rest.
    pub async fn publish(&self, record: T) {
        let record = Arc::new(record);
        let targets: Vec<(u64, mpsc::Sender<Arc<T>>)> = {
            let registry = self
                .shared
                .registry
                .lock()
                .expect("subscriber registry lock poisoned");
            registry
                .iter()
                .map(|(subscriber_id, sender)| (*subscriber_id, sender.clone()))
                .collect()
        };

        for (subscriber_id, sender) in targets {
            if sender.send(Arc::clone(&record)).await.is_err() {
                self.shared
                    .registry
                    .lock()
                    .expect("subscriber registry lock poisoned")
                    .remove(&subscriber_id);
            }
        }
    }

    // Drops every registered sender: each subscription drains whatever is
    // queued and then observes end-of-stream. Further subscribes yield
    // already-completed subscriptions.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared
            .registry
            .lock()
            .expect("subscriber registry lock poisoned")
            .clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .registry
            .lock()
            .expect("subscriber registry lock poisoned")
            .len()
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    subscriber_id: u64,
    receiver: mpsc::Receiver<Arc<T>>,
    shared: Weak<HubShared<T>>,
}

impl<T> Subscription<T> {
    pub fn subscriber_id(&self) -> u64 {
        self.subscriber_id
    }

    // Returns `None` once the hub has closed (or this subscription was
    // dropped from the registry) and all queued records are drained.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.receiver.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared
                .registry
                .lock()
                .expect("subscriber registry lock poisoned")
                .remove(&self.subscriber_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BroadcastHub;

    #[tokio::test]
    async fn every_subscriber_receives_records_in_publish_order() {
        let hub = BroadcastHub::new();
        let mut first = hub.subscribe(8);
        let mut second = hub.subscribe(8);

        for value in 0..5_u64 {
            hub.publish(value).await;
        }
        hub.close();

        for subscription in [&mut first, &mut second] {
            let mut seen = Vec::new();
            while let Some(record) = subscription.recv().await {
                seen.push(*record);
            }
            assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        }
    }

    #[tokio::test]
    async fn late_subscriber_only_sees_records_published_after_registration() {
        let hub = BroadcastHub::new();
        let mut early = hub.subscribe(8);

        hub.publish("before").await;
        let mut late = hub.subscribe(8);
        hub.publish("after").await;
        hub.close();

        assert_eq!(early.recv().await.as_deref(), Some(&"before"));
        assert_eq!(early.recv().await.as_deref(), Some(&"after"));
        assert_eq!(early.recv().await, None);

        assert_eq!(late.recv().await.as_deref(), Some(&"after"));
        assert_eq!(late.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_a_subscription_unregisters_it() {
        let hub: BroadcastHub<u64> = BroadcastHub::new();
        let subscription = hub.subscribe(4);
        assert_eq!(hub.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_after_close_observes_immediate_end_of_stream() {
        let hub: BroadcastHub<u64> = BroadcastHub::new();
        assert!(!hub.is_closed());
        hub.close();
        assert!(hub.is_closed());
        let mut subscription = hub.subscribe(4);
        assert_eq!(subscription.recv().await, None);
    }
}
