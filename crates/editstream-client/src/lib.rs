mod body;
mod client;
mod endpoint;
mod head;
mod transport;

use thiserror::Error;

pub use client::{ConnectionMetadata, EventStreamClient, StreamClientConfig};
pub use endpoint::{EndpointScheme, StreamEndpoint};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid stream endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("retry budget exhausted after {attempts} reconnect attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
