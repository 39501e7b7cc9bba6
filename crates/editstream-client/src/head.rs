use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: u16,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    Chunked,
    ContentLength(u64),
    CloseDelimited,
}

pub(crate) fn parse_response_head(raw: &[u8]) -> io::Result<ResponseHead> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response head is not UTF-8"))?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let status = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed response header line {line:?}"),
            ));
        };
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    Ok(ResponseHead { status, headers })
}

fn parse_status_line(line: &str) -> io::Result<u16> {
    let mut parts = line.split_ascii_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported response version in status line {line:?}"),
        ));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("missing status code in status line {line:?}"),
            )
        })
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header_name, _)| header_name == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_event_stream(&self) -> bool {
        let Some(content_type) = self.header("content-type") else {
            return false;
        };
        content_type
            .split(';')
            .next()
            .map(str::trim)
            .map(|base| base.eq_ignore_ascii_case("text/event-stream"))
            .unwrap_or(false)
    }

    pub fn body_framing(&self) -> io::Result<BodyFraming> {
        if let Some(transfer_encoding) = self.header("transfer-encoding") {
            let chunked = transfer_encoding
                .split(',')
                .map(str::trim)
                .any(|token| token.eq_ignore_ascii_case("chunked"));
            if chunked {
                return Ok(BodyFraming::Chunked);
            }
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported transfer encoding {transfer_encoding:?}"),
            ));
        }
        if let Some(content_length) = self.header("content-length") {
            let length = content_length.trim().parse::<u64>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid content-length {content_length:?}"),
                )
            })?;
            return Ok(BodyFraming::ContentLength(length));
        }
        Ok(BodyFraming::CloseDelimited)
    }
}
