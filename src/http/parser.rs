use bytes::Bytes;

use crate::http::request::{Headers, Method, Request};

const BOUNDARY: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No header/body boundary yet, or the declared body has not fully arrived.
    #[error("incomplete request")]
    Incomplete,

    /// The buffered request grew past the configured limit.
    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The request was fully framed but its request line is malformed.
    ///
    /// `consumed` bytes belong to the rejected request and must be skipped;
    /// `close` records whether the client asked for `Connection: close`.
    #[error("malformed request line")]
    InvalidRequest { consumed: usize, close: bool },
}

/// Request line plus header block, before the body is attached.
struct Head<'a> {
    request_line: &'a str,
    headers: Headers,
}

/// Parses one request from the front of `buf`.
///
/// Returns the request and how many bytes it occupied. The body is only read
/// when a Content-Length header carries an integer; otherwise the request
/// ends at the blank line. Empty lines ahead of the request line are skipped
/// and counted as consumed.
pub fn parse_http_request(buf: &[u8], max_request_bytes: usize) -> Result<(Request, usize), ParseError> {
    let too_large = ParseError::TooLarge { limit: max_request_bytes };
    let start = leading_blank_lines(buf);

    let Some(headers_end) = find_headers_end(&buf[start..]).map(|end| start + end) else {
        if buf.len() > max_request_bytes {
            return Err(too_large);
        }
        return Err(ParseError::Incomplete);
    };

    let head_text = String::from_utf8_lossy(&buf[start..headers_end]);
    let head = scan_head(&head_text);

    let body_start = headers_end + BOUNDARY.len();
    let declared = declared_length(&head.headers);
    let consumed = body_start
        .checked_add(declared)
        .filter(|total| *total <= max_request_bytes)
        .ok_or(too_large)?;

    if buf.len() < consumed {
        return Err(ParseError::Incomplete);
    }

    let body = Bytes::copy_from_slice(&buf[body_start..consumed]);
    let request = build_request(head, Some(body)).map_err(|close| ParseError::InvalidRequest { consumed, close })?;

    Ok((request, consumed))
}

/// Parses whatever is left in `buf` after the peer stopped sending.
///
/// Without a boundary the request has no body at all. With one, the body is
/// whatever arrived, cut at the declared Content-Length.
pub fn parse_at_eof(buf: &[u8]) -> Result<Request, ParseError> {
    let rest = &buf[leading_blank_lines(buf)..];
    let (head_bytes, body) = match find_headers_end(rest) {
        Some(end) => (&rest[..end], Some(&rest[end + BOUNDARY.len()..])),
        None => (rest, None),
    };

    let head_text = String::from_utf8_lossy(head_bytes);
    let head = scan_head(&head_text);

    let body = body.map(|available| {
        let limit = declared_length(&head.headers).min(available.len());
        Bytes::copy_from_slice(&available[..limit])
    });

    build_request(head, body).map_err(|close| ParseError::InvalidRequest { consumed: buf.len(), close })
}

/// Splits the head into its request line and header lines.
///
/// A header line is split at its first colon; lines without one are skipped.
fn scan_head(text: &str) -> Head<'_> {
    let (request_line, header_block) = text.split_once("\r\n").unwrap_or((text, ""));

    let headers = header_block
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    Head { request_line, headers }
}

/// Attaches the body to a scanned head. On a malformed request line the
/// error carries whether the client asked to close.
fn build_request(head: Head<'_>, body: Option<Bytes>) -> Result<Request, bool> {
    let close = head
        .headers
        .get("Connection")
        .map(|v| v.eq_ignore_ascii_case("close"))
        .unwrap_or(false);

    let mut parts = head.request_line.split(' ');
    let (Some(method), Some(path), Some(version)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(close);
    };

    if method.is_empty() {
        return Err(close);
    }

    Ok(Request {
        method: Method::parse(method),
        path: path.to_string(),
        version: version.to_string(),
        headers: head.headers,
        body,
    })
}

/// Body length to frame: the Content-Length value, or zero when it is absent
/// or not an integer.
fn declared_length(headers: &Headers) -> usize {
    headers
        .get("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

/// Length of the run of CRLF pairs at the front of `buf`.
fn leading_blank_lines(buf: &[u8]) -> usize {
    buf.chunks_exact(2).take_while(|pair| *pair == b"\r\n").count() * 2
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(BOUNDARY.len()).position(|w| w == BOUNDARY)
}
