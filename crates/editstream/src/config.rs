use std::time::Duration;

use editstream_client::{StreamClientConfig, StreamEndpoint};

use crate::errors::EditStreamError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditStreamConfig {
    pub url: String,
    pub initial_retry_ms: u64,
    pub max_reconnect_attempts: Option<u32>,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub subscriber_queue_capacity: usize,
}

impl Default for EditStreamConfig {
    fn default() -> Self {
        Self {
            url: "https://stream.wikimedia.org/v2/stream/recentchange".to_string(),
            initial_retry_ms: 3_000,
            max_reconnect_attempts: None,
            connect_timeout_ms: 10_000,
            idle_timeout_ms: 60_000,
            subscriber_queue_capacity: 64,
        }
    }
}

impl EditStreamConfig {
    pub fn validate(&self) -> Result<(), EditStreamError> {
        StreamEndpoint::parse(&self.url)
            .map_err(|error| EditStreamError::InvalidConfig(error.to_string()))?;
        if self.initial_retry_ms == 0 {
            return Err(EditStreamError::InvalidConfig(
                "initial_retry_ms must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(EditStreamError::InvalidConfig(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout_ms == 0 {
            return Err(EditStreamError::InvalidConfig(
                "idle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.subscriber_queue_capacity == 0 {
            return Err(EditStreamError::InvalidConfig(
                "subscriber_queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn client_config(&self) -> StreamClientConfig {
        StreamClientConfig {
            url: self.url.clone(),
            initial_retry: Duration::from_millis(self.initial_retry_ms),
            max_retries: self.max_reconnect_attempts,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditStreamConfig;

    #[test]
    fn default_config_validates() {
        EditStreamConfig::default()
            .validate()
            .expect("default config must validate");
    }

    #[test]
    fn rejects_bad_url_and_zero_values() {
        let bad_url = EditStreamConfig {
            url: "not-a-url".to_string(),
            ..EditStreamConfig::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_retry = EditStreamConfig {
            initial_retry_ms: 0,
            ..EditStreamConfig::default()
        };
        assert!(zero_retry.validate().is_err());

        let zero_capacity = EditStreamConfig {
            subscriber_queue_capacity: 0,
            ..EditStreamConfig::default()
        };
        assert!(zero_capacity.validate().is_err());
    }
}
