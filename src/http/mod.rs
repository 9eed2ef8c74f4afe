//! HTTP/1.1 protocol subset.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request-response state machine
//! - **`parser`**: Scans a byte buffer into a request (request line, headers, body)
//! - **`request`**: Request, method and case-insensitive header types
//! - **`encoding`**: Accept-Encoding negotiation and gzip compression
//! - **`response`**: Response representation with builder pattern
//! - **`writer`**: Serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Accumulate bytes until a full request is buffered
//!        └──────┬──────┘
//!               │ Request (or 400) ready          end of stream → Closing
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Route and run the handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Connection: close → Closing
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wicket::config::Config;
//! use wicket::http::connection::{Connection, ConnectionSettings};
//! use wicket::service::App;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::default();
//!     let app = Arc::new(App::from_config(&cfg));
//!     let listener = TcpListener::bind("127.0.0.1:4221").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let app = app.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, app, ConnectionSettings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod encoding;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
