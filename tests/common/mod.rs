//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use relay_gateway::{bootstrap, BlobStore, GatewayConfig, SecretSet, Shutdown};

/// A gateway running on an ephemeral port with its own snapshot directory.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: BlobStore,
    pub shutdown: Shutdown,
    pub dir: tempfile::TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Gateway URL that proxies to `target`, embedded as one
    /// percent-encoded path segment.
    pub fn proxy_url(&self, target: &str) -> String {
        let mut url = url::Url::parse(&self.url("/")).unwrap();
        url.path_segments_mut()
            .unwrap()
            .pop_if_empty()
            .extend(["api", "proxy", target]);
        url.to_string()
    }

    pub fn snapshot_path(&self) -> std::path::PathBuf {
        self.dir.path().join("store.json")
    }
}

pub async fn start_gateway(secrets: &[(&str, &str)]) -> TestGateway {
    start_gateway_with(secrets, |_| {}).await
}

pub async fn start_gateway_with<F>(secrets: &[(&str, &str)], configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    let dir = tempfile::tempdir().unwrap();
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.store.path = dir.path().join("store.json").to_string_lossy().into_owned();
    configure(&mut config);

    start_gateway_in(dir, config, secrets).await
}

/// Start a gateway whose snapshot lives in an existing directory.
pub async fn start_gateway_in(
    dir: tempfile::TempDir,
    config: GatewayConfig,
    secrets: &[(&str, &str)],
) -> TestGateway {
    let gateway = bootstrap(config, SecretSet::from_pairs(secrets.iter().copied())).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = gateway.server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        store: gateway.store,
        shutdown,
        dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let mut recorded = RecordedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: Vec::new(),
    };

    if let Some(len) = recorded.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        let mut body = vec![0; len];
        reader.read_exact(&mut body).await?;
        recorded.body = body;
    } else if recorded
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        loop {
            let mut size_line = String::new();
            reader.read_line(&mut size_line).await?;
            let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
            if size == 0 {
                let mut trailer = String::new();
                reader.read_line(&mut trailer).await?;
                break;
            }
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).await?;
            chunk.truncate(size);
            recorded.body.extend_from_slice(&chunk);
        }
    }

    Ok(recorded)
}

/// Start a mock upstream that records every request and answers with a
/// fixed status and body.
pub async fn start_recording_backend(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(recorded) = read_request(&mut socket).await else {
                    return;
                };
                let _ = tx.send(recorded);

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nX-Upstream: mock\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a mock upstream that streams chunks until the connection breaks,
/// then reports on the returned channel.
pub async fn start_endless_backend() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_err() {
                    return;
                }
                let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                loop {
                    let chunk = format!("{:x}\r\n{}\r\n", 1024, "x".repeat(1024));
                    if socket.write_all(chunk.as_bytes()).await.is_err() {
                        let _ = tx.send(());
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            });
        }
    });

    (addr, rx)
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
