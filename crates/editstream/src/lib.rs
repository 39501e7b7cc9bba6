mod config;
mod consumers;
mod edit;
mod errors;
mod metrics;
mod pipeline;

pub use config::EditStreamConfig;
pub use consumers::{spawn_edit_logger, EditCountsConfig, EditCountsWriter, EDIT_COUNTS_SCHEMA};
pub use edit::{decode_edit, WikiEdit};
pub use errors::EditStreamError;
pub use metrics::IngestMetrics;
pub use pipeline::{EditStreamPipeline, PipelineHandle};

pub use editstream_client::{ClientError, ConnectionMetadata};
pub use editstream_hub::{BroadcastHub, Subscription};
pub use editstream_sse::{EventId, SseEvent};
