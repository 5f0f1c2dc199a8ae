//! Integration Tests for the Proxy Port
//!
//! Drives a running `ProxyServer` over real TCP connections with a fake
//! origin behind it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cache_proxy::{
    cache::SharedCache,
    dispatch::{RequestDispatcher, UpstreamFetcher},
    limiter::TokenBucketLimiter,
    server::ConnectionGauge,
    ProxyServer, UpstreamError,
};
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

// == Helper Functions ==

#[derive(Default)]
struct CountingOrigin {
    calls: AtomicUsize,
}

#[async_trait]
impl UpstreamFetcher for CountingOrigin {
    async fn fetch(&self, url: &Url) -> Result<Bytes, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match url.path() {
            "/gone" => Err(UpstreamError::Status(410)),
            "/down" => Err(UpstreamError::Transport("connection refused".to_string())),
            path => Ok(Bytes::from(format!("body of {path}"))),
        }
    }
}

struct TestProxy {
    addr: SocketAddr,
    origin: Arc<CountingOrigin>,
    dispatcher: RequestDispatcher,
    gauge: Arc<ConnectionGauge>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_proxy(capacity: usize, max_tokens: u32) -> TestProxy {
    let origin = Arc::new(CountingOrigin::default());
    let dispatcher = RequestDispatcher::new(
        SharedCache::new(capacity, None),
        Arc::new(TokenBucketLimiter::new(max_tokens, Duration::from_secs(60))),
        origin.clone(),
    );
    let gauge = Arc::new(ConnectionGauge::new());
    let server = ProxyServer::new(
        dispatcher.clone(),
        4,
        Duration::from_secs(2),
        gauge.clone(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve(listener, async move {
        let _ = rx.await;
    }));

    TestProxy {
        addr,
        origin,
        dispatcher,
        gauge,
        shutdown: Some(tx),
    }
}

/// Sends raw bytes and returns (status code, headers, body).
async fn send_raw(addr: SocketAddr, request: &str) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header terminator");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let body = raw[split + 4..].to_vec();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status line carries a code");
    (status, head, body)
}

async fn get(addr: SocketAddr, url: &str) -> (u16, String, Vec<u8>) {
    send_raw(
        addr,
        &format!("GET {url} HTTP/1.1\r\nHost: origin.test\r\nAccept: */*\r\n\r\n"),
    )
    .await
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .and_then(|value| value.trim().parse().ok())
        .expect("Content-Length header present")
}

// == Cache Behavior ==

#[tokio::test]
async fn test_miss_then_hit_fetches_once() {
    let proxy = start_proxy(5, 10).await;

    let (status, head, body) = get(proxy.addr, "http://origin.test/page").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"body of /page");
    assert_eq!(content_length(&head), body.len());
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 1);

    let (status, _, body) = get(proxy.addr, "http://origin.test/page").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"body of /page");
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 1);

    let stats = proxy.dispatcher.stats().await;
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 1);
    assert_eq!(stats.requests.total_requests, 2);
}

#[tokio::test]
async fn test_request_without_version_or_headers() {
    let proxy = start_proxy(5, 10).await;

    let (status, _, body) = send_raw(proxy.addr, "GET http://origin.test/bare\r\n").await;

    assert_eq!(status, 200);
    assert_eq!(body, b"body of /bare");
}

#[tokio::test]
async fn test_lru_eviction_refetches_oldest() {
    let proxy = start_proxy(2, 20).await;

    get(proxy.addr, "http://origin.test/a").await;
    get(proxy.addr, "http://origin.test/b").await;
    // Touch a so b becomes least recently used.
    get(proxy.addr, "http://origin.test/a").await;
    get(proxy.addr, "http://origin.test/c").await;
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 3);

    get(proxy.addr, "http://origin.test/a").await;
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 3);

    get(proxy.addr, "http://origin.test/b").await;
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 4);

    let stats = proxy.dispatcher.stats().await;
    assert_eq!(stats.cache.evictions, 2);
    assert_eq!(stats.cache.size, 2);
}

// == Error Mapping ==

#[tokio::test]
async fn test_non_get_is_bad_request() {
    let proxy = start_proxy(5, 10).await;

    let (status, head, body) = send_raw(
        proxy.addr,
        "POST http://origin.test/form HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
    )
    .await;

    assert_eq!(status, 400);
    assert!(body.is_empty());
    assert_eq!(content_length(&head), 0);
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 0);
    assert_eq!(proxy.dispatcher.stats().await.requests.bad_requests, 1);
}

#[tokio::test]
async fn test_malformed_request_line_is_bad_request() {
    let proxy = start_proxy(5, 10).await;

    let (status, _, _) = send_raw(proxy.addr, "GARBAGE\r\n\r\n").await;
    assert_eq!(status, 400);

    let (status, _, _) = get(proxy.addr, "/relative/path").await;
    assert_eq!(status, 400);

    let (status, _, _) = get(proxy.addr, "ftp://origin.test/file").await;
    assert_eq!(status, 400);

    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 0);
    // No token was spent on any of them.
    assert_eq!(proxy.dispatcher.stats().await.tracked_clients, 0);
}

#[tokio::test]
async fn test_upstream_failures_map_to_status() {
    let proxy = start_proxy(5, 10).await;

    let (status, _, body) = get(proxy.addr, "http://origin.test/gone").await;
    assert_eq!(status, 404);
    assert!(body.is_empty());

    let (status, _, _) = get(proxy.addr, "http://origin.test/down").await;
    assert_eq!(status, 502);

    // Failures are not cached.
    get(proxy.addr, "http://origin.test/gone").await;
    assert_eq!(proxy.origin.calls.load(Ordering::SeqCst), 3);
    assert_eq!(proxy.dispatcher.cache().len().await, 0);
}

// == Rate Limiting ==

#[tokio::test]
async fn test_burst_then_rate_limited() {
    let proxy = start_proxy(5, 5).await;

    for _ in 0..5 {
        let (status, _, _) = get(proxy.addr, "http://origin.test/hot").await;
        assert_eq!(status, 200);
    }

    let (status, head, body) = get(proxy.addr, "http://origin.test/hot").await;
    assert_eq!(status, 429);
    assert!(body.is_empty());
    assert!(head.starts_with("HTTP/1.1 429 Too Many Requests"));

    let stats = proxy.dispatcher.stats().await;
    assert_eq!(stats.requests.rate_limited_requests, 1);
    assert_eq!(stats.requests.total_requests, 6);
    // A throttled request never reaches the cache.
    assert_eq!(stats.cache.hits, 4);
    assert_eq!(stats.cache.misses, 1);
}

// == Connection Handling ==

#[tokio::test]
async fn test_silent_client_is_dropped_and_gauge_settles() {
    let proxy = start_proxy(5, 10).await;

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    let mut buf = Vec::new();
    // The server gives up after its read timeout and closes the socket.
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("server closes idle connection");
    assert!(read.is_ok());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(proxy.gauge.active(), 0);
    assert_eq!(proxy.gauge.accepted(), 1);
}

#[tokio::test]
async fn test_concurrent_clients_are_all_served() {
    let proxy = start_proxy(5, 100).await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let addr = proxy.addr;
        handles.push(tokio::spawn(async move {
            get(addr, &format!("http://origin.test/item{}", i % 4)).await
        }));
    }

    for handle in handles {
        let (status, _, _) = handle.await.unwrap();
        assert_eq!(status, 200);
    }

    let stats = proxy.dispatcher.stats().await;
    assert_eq!(stats.requests.total_requests, 16);
    assert_eq!(stats.cache.hits + stats.cache.misses, 16);
}
