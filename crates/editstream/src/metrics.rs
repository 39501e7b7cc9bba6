use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestMetrics {
    pub events_received: u64,
    pub records_published: u64,
    pub decode_failure_count: u64,
    pub reconnect_attempt_count: u64,
}

#[derive(Debug, Default)]
pub(crate) struct IngestMetricsStore {
    events_received: AtomicU64,
    records_published: AtomicU64,
    decode_failure_count: AtomicU64,
    reconnect_attempt_count: AtomicU64,
}

impl IngestMetricsStore {
    pub(crate) fn snapshot(&self) -> IngestMetrics {
        IngestMetrics {
            events_received: self.events_received.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            decode_failure_count: self.decode_failure_count.load(Ordering::Relaxed),
            reconnect_attempt_count: self.reconnect_attempt_count.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.records_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_reconnect_attempts(&self, total: u64) {
        self.reconnect_attempt_count.store(total, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::IngestMetricsStore;

    #[test]
    fn ingest_metrics_counter_contract() {
        let store = IngestMetricsStore::default();

        store.record_event_received();
        store.record_event_received();
        store.record_published();
        store.record_decode_failure();
        store.set_reconnect_attempts(3);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.events_received, 2);
        assert_eq!(snapshot.records_published, 1);
        assert_eq!(snapshot.decode_failure_count, 1);
        assert_eq!(snapshot.reconnect_attempt_count, 3);
    }
}
