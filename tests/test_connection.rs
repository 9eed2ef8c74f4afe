//! End-to-end tests driving a connection over an in-memory pipe.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flate2::read::GzDecoder;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use wicket::http::connection::{Connection, ConnectionSettings};
use wicket::http::encoding::Encoding;
use wicket::http::request::Headers;
use wicket::service::App;
use wicket::service::files::FileStore;
use wicket::service::router::Router;

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "wicket-connection-{}-{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

struct Reply {
    status_line: String,
    headers: Headers,
    body: Vec<u8>,
}

fn spawn_connection(dir: Option<PathBuf>, settings: ConnectionSettings) -> (DuplexStream, JoinHandle<u64>) {
    let app = Arc::new(App::new(
        Router::standard(),
        FileStore::new(dir, 1024 * 1024),
        vec![Encoding::Gzip],
    ));
    let (client, server) = tokio::io::duplex(64 * 1024);

    let handle = tokio::spawn(async move {
        let mut conn = Connection::new(server, app, settings);
        conn.run().await.unwrap();
        conn.served()
    });

    (client, handle)
}

async fn read_reply(client: &mut DuplexStream) -> Reply {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(client.read_u8().await.unwrap());
    }

    let text = String::from_utf8(head).unwrap();
    let mut lines = text.trim_end().split("\r\n");
    let status_line = lines.next().unwrap().to_string();
    let headers: Headers = lines
        .map(|line| line.split_once(": ").unwrap())
        .collect();

    let length = headers
        .get("Content-Length")
        .map(|v| v.parse::<usize>().unwrap())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    client.read_exact(&mut body).await.unwrap();

    Reply { status_line, headers, body }
}

async fn assert_closed(client: &mut DuplexStream) {
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "unexpected trailing bytes: {rest:?}");
}

async fn finish(handle: JoinHandle<u64>) -> u64 {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("connection task did not finish")
        .unwrap()
}

#[tokio::test]
async fn test_echo_scenario() {
    let (mut client, _handle) = spawn_connection(None, ConnectionSettings::default());

    client.write_all(b"GET /echo/hello HTTP/1.1\r\n\r\n").await.unwrap();
    let reply = read_reply(&mut client).await;

    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
    assert_eq!(reply.headers.get("Content-Length"), Some("5"));
    assert_eq!(reply.body, b"hello".to_vec());
}

#[tokio::test]
async fn test_gzip_echo_scenario() {
    let (mut client, _handle) = spawn_connection(None, ConnectionSettings::default());

    client
        .write_all(b"GET /echo/hello HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n")
        .await
        .unwrap();
    let reply = read_reply(&mut client).await;

    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
    assert_eq!(reply.headers.get("Content-Encoding"), Some("gzip"));

    let mut decoded = String::new();
    GzDecoder::new(&reply.body[..]).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, "hello");
}

#[tokio::test]
async fn test_keep_alive_then_close() {
    let (mut client, handle) = spawn_connection(None, ConnectionSettings::default());

    client
        .write_all(b"GET /user-agent HTTP/1.1\r\nUser-Agent: foobar/1.2.3\r\n\r\n")
        .await
        .unwrap();
    let first = read_reply(&mut client).await;
    assert_eq!(first.body, b"foobar/1.2.3".to_vec());
    assert_eq!(first.headers.get("Connection"), None);

    client
        .write_all(b"GET /nonexistent HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_reply(&mut client).await;
    assert_eq!(second.status_line, "HTTP/1.1 404 Not Found");
    assert_eq!(second.headers.get("Connection"), Some("close"));
    assert_eq!(second.headers.get("Content-Length"), Some("0"));
    assert!(second.body.is_empty());

    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 2);
}

#[tokio::test]
async fn test_two_requests_in_one_write() {
    let (mut client, handle) = spawn_connection(None, ConnectionSettings::default());

    client
        .write_all(b"GET /echo/one HTTP/1.1\r\n\r\nGET /echo/two HTTP/1.1\r\nConnection: Close\r\n\r\n")
        .await
        .unwrap();

    assert_eq!(read_reply(&mut client).await.body, b"one".to_vec());
    assert_eq!(read_reply(&mut client).await.body, b"two".to_vec());
    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 2);
}

#[tokio::test]
async fn test_empty_lines_before_request_line() {
    let (mut client, handle) = spawn_connection(None, ConnectionSettings::default());

    client.write_all(b"GET /nope HTTP/1.1\r\n\r\n\r\n").await.unwrap();
    let first = read_reply(&mut client).await;
    assert_eq!(first.status_line, "HTTP/1.1 404 Not Found");

    client
        .write_all(b"\r\nGET /echo/next HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_reply(&mut client).await;
    assert_eq!(second.status_line, "HTTP/1.1 200 OK");
    assert_eq!(second.body, b"next".to_vec());

    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 2);
}

#[tokio::test]
async fn test_request_split_across_writes() {
    let settings = ConnectionSettings {
        read_buffer_size: 8,
        ..ConnectionSettings::default()
    };
    let (mut client, _handle) = spawn_connection(None, settings);

    for chunk in [&b"GET /ec"[..], b"ho/split HTTP/1.1\r", b"\nAccept: */*\r\n", b"\r\n"] {
        client.write_all(chunk).await.unwrap();
        tokio::task::yield_now().await;
    }

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.body, b"split".to_vec());
}

#[tokio::test]
async fn test_file_round_trip_over_connection() {
    let (mut client, _handle) = spawn_connection(Some(scratch_dir()), ConnectionSettings::default());

    client
        .write_all(b"POST /files/data.txt HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello")
        .await
        .unwrap();
    tokio::task::yield_now().await;
    client.write_all(b" world").await.unwrap();

    let created = read_reply(&mut client).await;
    assert_eq!(created.status_line, "HTTP/1.1 201 Created");

    client.write_all(b"GET /files/data.txt HTTP/1.1\r\n\r\n").await.unwrap();
    let fetched = read_reply(&mut client).await;
    assert_eq!(fetched.status_line, "HTTP/1.1 200 OK");
    assert_eq!(fetched.body, b"hello world".to_vec());
}

#[tokio::test]
async fn test_malformed_request_line_keeps_connection() {
    let (mut client, _handle) = spawn_connection(None, ConnectionSettings::default());

    client.write_all(b"GARBAGE\r\n\r\n").await.unwrap();
    let rejected = read_reply(&mut client).await;
    assert_eq!(rejected.status_line, "HTTP/1.1 400 Invalid request");
    assert_eq!(rejected.headers.get("Connection"), None);

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let ok = read_reply(&mut client).await;
    assert_eq!(ok.status_line, "HTTP/1.1 200 OK");
}

#[tokio::test]
async fn test_malformed_request_line_with_close() {
    let (mut client, handle) = spawn_connection(None, ConnectionSettings::default());

    client.write_all(b"GET\r\nConnection: close\r\n\r\n").await.unwrap();
    let rejected = read_reply(&mut client).await;

    assert_eq!(rejected.status_line, "HTTP/1.1 400 Invalid request");
    assert_eq!(rejected.headers.get("Connection"), Some("close"));
    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 1);
}

#[tokio::test]
async fn test_short_upload_then_half_close_is_truncated() {
    let dir = scratch_dir();
    let (mut client, handle) = spawn_connection(Some(dir.clone()), ConnectionSettings::default());

    client
        .write_all(b"POST /files/short.txt HTTP/1.1\r\nContent-Length: 20\r\n\r\nonly this")
        .await
        .unwrap();
    client.shutdown().await.unwrap();

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.status_line, "HTTP/1.1 201 Created");
    assert_eq!(reply.headers.get("Connection"), Some("close"));
    assert_eq!(std::fs::read(dir.join("short.txt")).unwrap(), b"only this".to_vec());

    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 1);
}

#[tokio::test]
async fn test_upload_without_boundary_at_eof_is_400() {
    let (mut client, handle) = spawn_connection(Some(scratch_dir()), ConnectionSettings::default());

    client
        .write_all(b"POST /files/x.txt HTTP/1.1\r\nContent-Length: 3\r\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.status_line, "HTTP/1.1 400 Invalid request");
    assert_eq!(finish(handle).await, 1);
}

#[tokio::test]
async fn test_invalid_content_length_closes_after_400() {
    let (mut client, handle) = spawn_connection(Some(scratch_dir()), ConnectionSettings::default());

    client
        .write_all(b"POST /files/x.txt HTTP/1.1\r\nContent-Length: abc\r\n\r\nabc")
        .await
        .unwrap();

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.status_line, "HTTP/1.1 400 Invalid request");
    assert_eq!(reply.headers.get("Connection"), Some("close"));
    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 1);
}

#[tokio::test]
async fn test_oversized_request_is_rejected_and_closed() {
    let settings = ConnectionSettings {
        max_request_bytes: 256,
        ..ConnectionSettings::default()
    };
    let (mut client, handle) = spawn_connection(None, settings);

    let mut request = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
    request.extend(std::iter::repeat(b'a').take(1024));
    client.write_all(&request).await.unwrap();

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.status_line, "HTTP/1.1 400 Invalid request");
    assert_eq!(reply.headers.get("Connection"), Some("close"));
    assert_eq!(finish(handle).await, 1);
}

#[tokio::test]
async fn test_client_closing_without_request() {
    let (mut client, handle) = spawn_connection(None, ConnectionSettings::default());

    client.shutdown().await.unwrap();

    assert_closed(&mut client).await;
    assert_eq!(finish(handle).await, 0);
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let settings = ConnectionSettings {
        read_timeout: Some(Duration::from_millis(50)),
        ..ConnectionSettings::default()
    };
    let (mut client, handle) = spawn_connection(None, settings);

    assert_eq!(finish(handle).await, 0);
    assert_closed(&mut client).await;
}
