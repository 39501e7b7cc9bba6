use thiserror::Error;

use editstream_client::ClientError;

#[derive(Debug, Error)]
pub enum EditStreamError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("event stream client failed: {0}")]
    Client(#[from] ClientError),
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
