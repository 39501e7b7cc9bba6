use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::endpoint::{EndpointScheme, StreamEndpoint};

#[derive(Debug)]
pub(crate) enum StreamTransport {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for StreamTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for StreamTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

pub(crate) async fn connect(
    endpoint: &StreamEndpoint,
    connect_timeout: Duration,
) -> io::Result<StreamTransport> {
    let deadline = tokio::time::Instant::now() + connect_timeout;
    let tcp = connect_tcp_with_deadline(&endpoint.host, endpoint.port, deadline).await?;

    match endpoint.scheme {
        EndpointScheme::Http => Ok(StreamTransport::Plain(tcp)),
        EndpointScheme::Https => {
            let connector = TlsConnector::from(event_stream_client_config());
            let server_name = ServerName::try_from(endpoint.host.clone()).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid TLS server name {:?}", endpoint.host),
                )
            })?;
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let tls = tokio::time::timeout(remaining, connector.connect(server_name, tcp))
                .await
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out")
                })??;
            Ok(StreamTransport::Tls(Box::new(tls)))
        }
    }
}

async fn connect_tcp_with_deadline(
    host: &str,
    port: u16,
    deadline: tokio::time::Instant,
) -> io::Result<TcpStream> {
    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if remaining.is_zero() {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "upstream address resolution timed out",
        ));
    }
    let resolved = tokio::time::timeout(remaining, tokio::net::lookup_host((host, port)))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                "upstream address resolution timed out",
            )
        })?
        .map_err(|error| {
            io::Error::new(
                error.kind(),
                format!("upstream address resolution failed: {error}"),
            )
        })?;

    let mut last_error: Option<io::Error> = None;
    for addr in resolved {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "upstream connect timed out",
            ));
        }
        match tokio::time::timeout(remaining, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(error)) => last_error = Some(error),
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "upstream connect timed out",
                ))
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "upstream address resolution returned no socket addresses",
        )
    }))
}

fn event_stream_client_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let mut config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Arc::new(config)
}

pub(crate) async fn read_with_idle_timeout<R>(
    stream: &mut R,
    buf: &mut [u8],
    idle_timeout: Duration,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(idle_timeout, tokio::io::AsyncReadExt::read(stream, buf)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("stream idle for more than {}ms", idle_timeout.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::connect_tcp_with_deadline;

    #[tokio::test]
    async fn connects_to_listening_socket_before_deadline() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind listener");
        let port = listener.local_addr().expect("listener addr").port();

        let stream = connect_tcp_with_deadline(
            "127.0.0.1",
            port,
            tokio::time::Instant::now() + Duration::from_secs(2),
        )
        .await
        .expect("connect must succeed");
        drop(stream);
    }

    #[tokio::test]
    async fn expired_deadline_reports_timeout() {
        let error = connect_tcp_with_deadline(
            "127.0.0.1",
            9,
            tokio::time::Instant::now(),
        )
        .await
        .expect_err("expired deadline must fail");
        assert_eq!(error.kind(), std::io::ErrorKind::TimedOut);
    }
}
