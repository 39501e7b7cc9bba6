use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::head::BodyFraming;
use crate::transport::read_with_idle_timeout;

const IO_CHUNK_SIZE: usize = 8 * 1024;
const CHUNK_LINE_LIMIT: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramingState {
    CloseDelimited,
    ContentLength { remaining: u64 },
    Chunked(ChunkedState),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    SizeLine,
    Data { remaining: u64 },
    DataTerminator,
    Trailers,
}

#[derive(Debug)]
pub(crate) struct BodyReader<S> {
    stream: S,
    read_buf: Vec<u8>,
    framing: FramingState,
    idle_timeout: Duration,
}

impl<S: AsyncRead + Unpin> BodyReader<S> {
    pub fn new(stream: S, leftover: Vec<u8>, framing: BodyFraming, idle_timeout: Duration) -> Self {
        let framing = match framing {
            BodyFraming::Chunked => FramingState::Chunked(ChunkedState::SizeLine),
            BodyFraming::ContentLength(length) => FramingState::ContentLength { remaining: length },
            BodyFraming::CloseDelimited => FramingState::CloseDelimited,
        };
        Self {
            stream,
            read_buf: leftover,
            framing,
            idle_timeout,
        }
    }

    // One payload chunk per call; `None` once the body has completed
    // cleanly. Transport errors and framing violations surface as
    // `io::Error` and leave the reader unusable.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            match self.framing {
                FramingState::Done => return Ok(None),
                FramingState::CloseDelimited => {
                    if !self.read_buf.is_empty() {
                        return Ok(Some(self.drain_buffered(self.read_buf.len())));
                    }
                    if self.fill().await? == 0 {
                        self.framing = FramingState::Done;
                        return Ok(None);
                    }
                }
                FramingState::ContentLength { remaining } => {
                    if remaining == 0 {
                        self.framing = FramingState::Done;
                        return Ok(None);
                    }
                    if self.read_buf.is_empty() && self.fill().await? == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed before body completed",
                        ));
                    }
                    let take = std::cmp::min(remaining as usize, self.read_buf.len());
                    self.framing = FramingState::ContentLength {
                        remaining: remaining - take as u64,
                    };
                    return Ok(Some(self.drain_buffered(take)));
                }
                FramingState::Chunked(state) => {
                    if let Some(chunk) = self.step_chunked(state).await? {
                        return Ok(Some(chunk));
                    }
                    if self.framing == FramingState::Done {
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn step_chunked(&mut self, state: ChunkedState) -> io::Result<Option<Bytes>> {
        match state {
            ChunkedState::SizeLine => {
                let Some(line_end) = find_crlf(&self.read_buf) else {
                    if self.read_buf.len() > CHUNK_LINE_LIMIT {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "chunk size line exceeded limit",
                        ));
                    }
                    if self.fill().await? == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed before chunk size line was read",
                        ));
                    }
                    return Ok(None);
                };
                let chunk_len = parse_chunk_len(&self.read_buf[..line_end])?;
                self.read_buf.drain(..line_end + 2);
                self.framing = if chunk_len == 0 {
                    FramingState::Chunked(ChunkedState::Trailers)
                } else {
                    FramingState::Chunked(ChunkedState::Data {
                        remaining: chunk_len,
                    })
                };
                Ok(None)
            }
            ChunkedState::Data { remaining } => {
                if self.read_buf.is_empty() && self.fill().await? == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed inside a chunk",
                    ));
                }
                let take = std::cmp::min(remaining as usize, self.read_buf.len());
                self.framing = if remaining == take as u64 {
                    FramingState::Chunked(ChunkedState::DataTerminator)
                } else {
                    FramingState::Chunked(ChunkedState::Data {
                        remaining: remaining - take as u64,
                    })
                };
                Ok(Some(self.drain_buffered(take)))
            }
            ChunkedState::DataTerminator => {
                while self.read_buf.len() < 2 {
                    if self.fill().await? == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed before chunk terminator",
                        ));
                    }
                }
                if &self.read_buf[..2] != b"\r\n" {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid chunk terminator",
                    ));
                }
                self.read_buf.drain(..2);
                self.framing = FramingState::Chunked(ChunkedState::SizeLine);
                Ok(None)
            }
            ChunkedState::Trailers => {
                if self.read_buf.starts_with(b"\r\n") {
                    self.read_buf.drain(..2);
                    self.framing = FramingState::Done;
                    return Ok(None);
                }
                if let Some(line_end) = find_crlf(&self.read_buf) {
                    // Trailer lines are accepted and discarded.
                    self.read_buf.drain(..line_end + 2);
                    return Ok(None);
                }
                if self.read_buf.len() > CHUNK_LINE_LIMIT {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "chunked trailer line exceeded limit",
                    ));
                }
                if self.fill().await? == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before chunked trailers completed",
                    ));
                }
                Ok(None)
            }
        }
    }

    async fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0_u8; IO_CHUNK_SIZE];
        let read = read_with_idle_timeout(&mut self.stream, &mut chunk, self.idle_timeout).await?;
        self.read_buf.extend_from_slice(&chunk[..read]);
        Ok(read)
    }

    fn drain_buffered(&mut self, take: usize) -> Bytes {
        Bytes::from(self.read_buf.drain(..take).collect::<Vec<_>>())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == b"\r\n")
}

fn parse_chunk_len(line: &[u8]) -> io::Result<u64> {
    let text = std::str::from_utf8(line).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "chunk size line had invalid UTF-8",
        )
    })?;
    let trimmed = text.trim();
    let size_text = trimmed.split(';').next().unwrap_or(trimmed).trim();
    u64::from_str_radix(size_text, 16).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "chunk size line had invalid hex length",
        )
    })
}
