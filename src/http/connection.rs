use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::parser::{parse_at_eof, parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::service::App;

/// Per-connection read limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_buffer_size: usize,
    pub max_request_bytes: usize,
    pub read_timeout: Option<Duration>,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            read_buffer_size: cfg.read_buffer_size,
            max_request_bytes: cfg.max_request_bytes,
            read_timeout: cfg.read_timeout(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What the reading step produced.
pub enum Inbound {
    /// A parsed request. `last` means nothing can follow it on this
    /// connection (peer finished sending, or the body could not be framed).
    Request { request: Request, last: bool },
    /// Bytes that could not be turned into a request.
    Rejected { error: ParseError, close: bool },
}

pub enum ConnectionState {
    Reading,
    Dispatching(Inbound),
    Writing(ResponseWriter, bool), // bool = close after writing?
    Closing,
}

/// Drives one client connection through read, dispatch and write cycles.
///
/// Requests are answered strictly in order; the next one is not read until
/// the previous response has been written.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    app: Arc<App>,
    settings: ConnectionSettings,
    served: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, app: Arc<App>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(settings.read_buffer_size),
            state: ConnectionState::Reading,
            app,
            settings,
            served: 0,
        }
    }

    /// Number of responses written so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closing);

            self.state = match state {
                ConnectionState::Reading => match self.read_request().await? {
                    Some(inbound) => ConnectionState::Dispatching(inbound),
                    None => ConnectionState::Closing,
                },

                ConnectionState::Dispatching(inbound) => {
                    let (mut response, close) = self.dispatch(inbound).await;

                    if close {
                        response.close_connection();
                    }

                    ConnectionState::Writing(ResponseWriter::new(&response), close)
                }

                ConnectionState::Writing(mut writer, close) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    self.served += 1;

                    if close {
                        ConnectionState::Closing
                    } else {
                        ConnectionState::Reading // go back for next request
                    }
                }

                ConnectionState::Closing => {
                    if let Err(e) = self.stream.shutdown().await {
                        debug!(error = %e, "Shutdown after close failed");
                    }
                    break;
                }
            };
        }

        Ok(())
    }

    /// Reads until one request is available. `None` means the connection is
    /// done: the peer closed with nothing pending, or the read timed out.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Inbound>> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer, self.settings.max_request_bytes) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    let last = matches!(request.content_length(), Some(Err(_)));
                    return Ok(Some(Inbound::Request { request, last }));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(error @ ParseError::InvalidRequest { consumed, close }) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(Inbound::Rejected { error, close }));
                }

                Err(error @ ParseError::TooLarge { .. }) => {
                    self.buffer.clear();
                    return Ok(Some(Inbound::Rejected { error, close: true }));
                }
            }

            // Read more data
            self.buffer.reserve(self.settings.read_buffer_size);
            let read = self.stream.read_buf(&mut self.buffer);

            let n = match self.settings.read_timeout {
                Some(limit) => match tokio::time::timeout(limit, read).await {
                    Ok(n) => n?,
                    Err(_) => {
                        debug!(timeout = ?limit, "Read timed out");
                        return Ok(None);
                    }
                },
                None => read.await?,
            };

            if n == 0 {
                // Client closed its side
                return Ok(self.drain_at_eof());
            }
        }
    }

    /// Turns bytes left over at end-of-stream into a final request.
    fn drain_at_eof(&mut self) -> Option<Inbound> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        let parsed = parse_at_eof(&self.buffer);
        self.buffer.clear();

        Some(match parsed {
            Ok(request) => Inbound::Request { request, last: true },
            Err(error) => Inbound::Rejected { error, close: true },
        })
    }

    async fn dispatch(&self, inbound: Inbound) -> (Response, bool) {
        match inbound {
            Inbound::Request { request, last } => {
                if last && !request.wants_close() {
                    debug!(path = %request.path, "Final request on this connection");
                }
                let response = self.app.dispatch(&request).await;
                (response, last || request.wants_close())
            }
            Inbound::Rejected { error, close } => {
                warn!(error = %error, "Rejecting request");
                (Response::bad_request(), close)
            }
        }
    }
}
