use std::sync::Arc;
use std::time::Duration;

use editstream_client::EventStreamClient;
use editstream_hub::{BroadcastHub, Subscription};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::EditStreamConfig;
use crate::edit::{decode_edit, WikiEdit};
use crate::errors::EditStreamError;
use crate::metrics::{IngestMetrics, IngestMetricsStore};

pub struct EditStreamPipeline {
    config: EditStreamConfig,
}

impl EditStreamPipeline {
    pub fn new(config: EditStreamConfig) -> Result<Self, EditStreamError> {
        config.validate()?;
        Ok(Self { config })
    }

    // Spawns the single producer task (client -> decoder -> hub.publish)
    // and hands back the subscribe/metrics/shutdown surface.
    pub fn start(self) -> Result<PipelineHandle, EditStreamError> {
        let client = EventStreamClient::new(self.config.client_config())?;
        let hub = BroadcastHub::new();
        let metrics_store = Arc::new(IngestMetricsStore::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let producer_hub = hub.clone();
        let producer_metrics = Arc::clone(&metrics_store);
        let join_handle = tokio::spawn(run_producer(
            client,
            producer_hub,
            producer_metrics,
            shutdown_rx,
        ));

        Ok(PipelineHandle {
            hub,
            metrics_store,
            default_queue_capacity: self.config.subscriber_queue_capacity,
            join_handle: Mutex::new(Some(join_handle)),
            shutdown_tx,
        })
    }
}

async fn run_producer(
    client: EventStreamClient,
    hub: BroadcastHub<WikiEdit>,
    metrics: Arc<IngestMetricsStore>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), EditStreamError> {
    let result = tokio::select! {
        result = ingest_loop(client, &hub, &metrics) => result,
        _ = shutdown_rx.changed() => Ok(()),
    };
    // Whatever the exit path, subscribers observe end-of-stream and the
    // upstream connection is dropped with the client.
    hub.close();
    result
}

async fn ingest_loop(
    mut client: EventStreamClient,
    hub: &BroadcastHub<WikiEdit>,
    metrics: &IngestMetricsStore,
) -> Result<(), EditStreamError> {
    loop {
        let event = client.next_event().await?;
        metrics.record_event_received();
        metrics.set_reconnect_attempts(u64::from(client.metadata().attempt_count));

        match decode_edit(&event.data) {
            Ok(edit) => {
                hub.publish(edit).await;
                metrics.record_published();
            }
            Err(error) => {
                tracing::warn!(payload = %event.data, error = %error, "dropping undecodable edit payload");
                metrics.record_decode_failure();
            }
        }
    }
}

pub struct PipelineHandle {
    hub: BroadcastHub<WikiEdit>,
    metrics_store: Arc<IngestMetricsStore>,
    default_queue_capacity: usize,
    join_handle: Mutex<Option<JoinHandle<Result<(), EditStreamError>>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl PipelineHandle {
    pub fn subscribe(&self) -> Subscription<WikiEdit> {
        self.hub.subscribe(self.default_queue_capacity)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Subscription<WikiEdit> {
        self.hub.subscribe(capacity)
    }

    pub fn metrics(&self) -> IngestMetrics {
        self.metrics_store.snapshot()
    }

    // Terminal producer result: `Ok` after a requested shutdown, `Err`
    // once the client's retry budget is exhausted.
    pub async fn join(self) -> Result<(), EditStreamError> {
        let mut guard = self.join_handle.lock().await;
        let Some(handle) = guard.take() else {
            return Ok(());
        };
        handle.await?
    }

    pub async fn shutdown(self, timeout: Duration) -> Result<(), EditStreamError> {
        let _ = self.shutdown_tx.send(true);
        let mut guard = self.join_handle.lock().await;
        let Some(mut handle) = guard.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(join_result) => match join_result {
                Ok(result) => result,
                Err(error) if error.is_cancelled() => Ok(()),
                Err(error) => Err(EditStreamError::Join(error)),
            },
            Err(_) => {
                // The graceful window can elapse while publish is parked
                // on a stalled subscriber; abort drops the connection.
                handle.abort();
                match handle.await {
                    Ok(result) => result,
                    Err(error) if error.is_cancelled() => Ok(()),
                    Err(error) => Err(EditStreamError::Join(error)),
                }
            }
        }
    }
}
