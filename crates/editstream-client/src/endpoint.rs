use crate::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointScheme {
    Http,
    Https,
}

impl EndpointScheme {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub scheme: EndpointScheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl StreamEndpoint {
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let url = url.trim();
        let (scheme, remainder) = if let Some(remainder) = url.strip_prefix("https://") {
            (EndpointScheme::Https, remainder)
        } else if let Some(remainder) = url.strip_prefix("http://") {
            (EndpointScheme::Http, remainder)
        } else {
            return Err(ClientError::InvalidEndpoint(format!(
                "unsupported scheme in {url:?}, expected http:// or https://"
            )));
        };

        let (authority, path) = match remainder.find('/') {
            Some(slash_index) => (
                &remainder[..slash_index],
                remainder[slash_index..].to_string(),
            ),
            None => (remainder, "/".to_string()),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port_text)) => {
                let port = port_text.parse::<u16>().map_err(|_| {
                    ClientError::InvalidEndpoint(format!("invalid port {port_text:?} in {url:?}"))
                })?;
                (host, port)
            }
            None => (authority, scheme.default_port()),
        };

        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint(format!(
                "missing host in {url:?}"
            )));
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path,
        })
    }

    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointScheme, StreamEndpoint};

    #[test]
    fn parses_https_url_with_default_port_and_path() {
        let endpoint = StreamEndpoint::parse("https://stream.wikimedia.org/v2/stream/recentchange")
            .expect("endpoint must parse");
        assert_eq!(endpoint.scheme, EndpointScheme::Https);
        assert_eq!(endpoint.host, "stream.wikimedia.org");
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.path, "/v2/stream/recentchange");
        assert_eq!(endpoint.host_header(), "stream.wikimedia.org");
    }

    #[test]
    fn parses_http_url_with_explicit_port_and_bare_host() {
        let endpoint =
            StreamEndpoint::parse("http://127.0.0.1:8080").expect("endpoint must parse");
        assert_eq!(endpoint.scheme, EndpointScheme::Http);
        assert_eq!(endpoint.port, 8080);
        assert_eq!(endpoint.path, "/");
        assert_eq!(endpoint.host_header(), "127.0.0.1:8080");
    }

    #[test]
    fn keeps_query_string_in_path() {
        let endpoint = StreamEndpoint::parse("http://example.com/stream?since=now")
            .expect("endpoint must parse");
        assert_eq!(endpoint.path, "/stream?since=now");
    }

    #[test]
    fn rejects_unknown_scheme_missing_host_and_bad_port() {
        assert!(StreamEndpoint::parse("ws://example.com/stream").is_err());
        assert!(StreamEndpoint::parse("http:///stream").is_err());
        assert!(StreamEndpoint::parse("http://example.com:notaport/").is_err());
    }
}
