use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use editstream_sse::{EventId, SseEvent, SseParser};
use tokio::io::AsyncWriteExt;

use crate::body::BodyReader;
use crate::endpoint::StreamEndpoint;
use crate::head::parse_response_head;
use crate::transport::{self, read_with_idle_timeout, StreamTransport};
use crate::ClientError;

const MAX_RESPONSE_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamClientConfig {
    pub url: String,
    pub initial_retry: Duration,
    pub max_retries: Option<u32>,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            url: "https://stream.wikimedia.org/v2/stream/recentchange".to_string(),
            initial_retry: Duration::from_millis(3_000),
            max_retries: None,
            connect_timeout: Duration::from_millis(10_000),
            idle_timeout: Duration::from_millis(60_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub last_event_id: Option<String>,
    pub retry_interval: Duration,
    pub attempt_count: u32,
}

enum ClientState {
    Connecting,
    Streaming {
        body: BodyReader<StreamTransport>,
        parser: SseParser,
    },
    Reconnecting {
        error: io::Error,
    },
    Failed {
        attempts: u32,
        last_error: String,
    },
}

pub struct EventStreamClient {
    endpoint: StreamEndpoint,
    config: StreamClientConfig,
    metadata: ConnectionMetadata,
    state: ClientState,
    pending: VecDeque<SseEvent>,
}

impl EventStreamClient {
    pub fn new(config: StreamClientConfig) -> Result<Self, ClientError> {
        let endpoint = StreamEndpoint::parse(&config.url)?;
        let metadata = ConnectionMetadata {
            last_event_id: None,
            retry_interval: config.initial_retry,
            attempt_count: 0,
        };
        Ok(Self {
            endpoint,
            config,
            metadata,
            state: ClientState::Connecting,
            pending: VecDeque::new(),
        })
    }

    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    // One decoded event per call, reconnecting through connection loss
    // behind the scenes. The only error ever returned is an exhausted
    // retry budget; everything else feeds the Reconnecting state.
    pub async fn next_event(&mut self) -> Result<SseEvent, ClientError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                self.track_event(&event);
                return Ok(event);
            }

            match std::mem::replace(&mut self.state, ClientState::Connecting) {
                ClientState::Connecting => match self.open_stream().await {
                    Ok(body) => {
                        self.state = ClientState::Streaming {
                            body,
                            parser: SseParser::new(),
                        };
                    }
                    Err(error) => {
                        self.state = ClientState::Reconnecting { error };
                    }
                },
                ClientState::Streaming {
                    mut body,
                    mut parser,
                } => match body.next_chunk().await {
                    Ok(Some(chunk)) => {
                        self.pending.extend(parser.push_bytes(&chunk));
                        self.state = ClientState::Streaming { body, parser };
                    }
                    Ok(None) => {
                        // Clean close: a dangling non-empty block is
                        // flushed before the reconnect delay starts.
                        self.pending.extend(parser.finish());
                        self.state = ClientState::Reconnecting {
                            error: io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "upstream closed the event stream",
                            ),
                        };
                    }
                    Err(error) => {
                        self.state = ClientState::Reconnecting { error };
                    }
                },
                ClientState::Reconnecting { error } => {
                    self.metadata.attempt_count += 1;
                    if let Some(max_retries) = self.config.max_retries {
                        if self.metadata.attempt_count > max_retries {
                            self.state = ClientState::Failed {
                                attempts: max_retries,
                                last_error: error.to_string(),
                            };
                            continue;
                        }
                    }
                    tracing::warn!(
                        attempt = self.metadata.attempt_count,
                        delay_ms = self.metadata.retry_interval.as_millis() as u64,
                        error = %error,
                        "event stream connection lost, reconnecting"
                    );
                    tokio::time::sleep(self.metadata.retry_interval).await;
                    self.state = ClientState::Connecting;
                }
                ClientState::Failed {
                    attempts,
                    last_error,
                } => {
                    let error = ClientError::RetriesExhausted {
                        attempts,
                        last_error: last_error.clone(),
                    };
                    self.state = ClientState::Failed {
                        attempts,
                        last_error,
                    };
                    return Err(error);
                }
            }
        }
    }

    fn track_event(&mut self, event: &SseEvent) {
        match &event.id {
            Some(EventId::Value(id)) => self.metadata.last_event_id = Some(id.clone()),
            Some(EventId::Reset) => self.metadata.last_event_id = None,
            None => {}
        }
        if let Some(retry_ms) = event.retry_ms {
            self.metadata.retry_interval = Duration::from_millis(retry_ms);
        }
    }

    async fn open_stream(&self) -> io::Result<BodyReader<StreamTransport>> {
        let mut stream = transport::connect(&self.endpoint, self.config.connect_timeout).await?;

        let request = self.build_request_head();
        tokio::time::timeout(self.config.idle_timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, "request head write timed out")
            })??;

        let (head_bytes, leftover) = read_response_head_bytes(
            &mut stream,
            self.config.idle_timeout,
        )
        .await?;
        let head = parse_response_head(&head_bytes)?;
        if !(200..300).contains(&head.status) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("upstream responded with status {}", head.status),
            ));
        }
        if !head.is_event_stream() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "upstream content type is not text/event-stream",
            ));
        }
        let framing = head.body_framing()?;
        Ok(BodyReader::new(
            stream,
            leftover,
            framing,
            self.config.idle_timeout,
        ))
    }

    fn build_request_head(&self) -> String {
        let mut request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n",
            self.endpoint.path,
            self.endpoint.host_header()
        );
        if let Some(last_event_id) = &self.metadata.last_event_id {
            request.push_str(&format!("Last-Event-ID: {last_event_id}\r\n"));
        }
        request.push_str("\r\n");
        request
    }
}

async fn read_response_head_bytes(
    stream: &mut StreamTransport,
    idle_timeout: Duration,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut data = Vec::new();
    loop {
        if let Some(boundary) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            let leftover = data.split_off(boundary + 4);
            return Ok((data, leftover));
        }
        if data.len() > MAX_RESPONSE_HEAD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response head exceeded limit",
            ));
        }
        let mut chunk = [0_u8; 1024];
        let read = read_with_idle_timeout(stream, &mut chunk, idle_timeout).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before response head completed",
            ));
        }
        data.extend_from_slice(&chunk[..read]);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use editstream_sse::{EventId, SseEvent};

    use super::{EventStreamClient, StreamClientConfig};

    fn test_client() -> EventStreamClient {
        EventStreamClient::new(StreamClientConfig {
            url: "http://127.0.0.1:9/stream".to_string(),
            ..StreamClientConfig::default()
        })
        .expect("client must build")
    }

    fn event(id: Option<EventId>, retry_ms: Option<u64>) -> SseEvent {
        SseEvent {
            id,
            retry_ms,
            data: "payload".to_string(),
        }
    }

    #[test]
    fn literal_id_updates_resume_state_and_retry_overrides_delay() {
        let mut client = test_client();
        client.track_event(&event(Some(EventId::Value("42".to_string())), Some(5_000)));
        assert_eq!(client.metadata().last_event_id.as_deref(), Some("42"));
        assert_eq!(client.metadata().retry_interval, Duration::from_millis(5_000));
    }

    #[test]
    fn reset_sentinel_clears_resume_state() {
        let mut client = test_client();
        client.track_event(&event(Some(EventId::Value("42".to_string())), None));
        client.track_event(&event(Some(EventId::Reset), None));
        assert_eq!(client.metadata().last_event_id, None);
    }

    #[test]
    fn id_less_event_leaves_resume_state_untouched() {
        let mut client = test_client();
        client.track_event(&event(Some(EventId::Value("42".to_string())), None));
        client.track_event(&event(None, None));
        assert_eq!(client.metadata().last_event_id.as_deref(), Some("42"));
    }

    #[test]
    fn request_head_carries_resume_header_only_when_tracked() {
        let mut client = test_client();
        let initial = client.build_request_head();
        assert!(initial.contains("Accept: text/event-stream\r\n"));
        assert!(initial.contains("Cache-Control: no-cache\r\n"));
        assert!(!initial.contains("Last-Event-ID"));

        client.track_event(&event(Some(EventId::Value("7".to_string())), None));
        let resumed = client.build_request_head();
        assert!(resumed.contains("Last-Event-ID: 7\r\n"));
    }

    #[test]
    fn invalid_endpoint_is_rejected_at_construction() {
        let result = EventStreamClient::new(StreamClientConfig {
            url: "ftp://example.com/stream".to_string(),
            ..StreamClientConfig::default()
        });
        assert!(result.is_err());
    }
}
