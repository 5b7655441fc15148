//! Shared utilities for integration testing.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use aggregation_gateway::config::{DependencyConfig, GatewayConfig};
use aggregation_gateway::http::HttpServer;
use aggregation_gateway::lifecycle::Shutdown;

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` is invoked once per connection and returns `(status, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock upstream that always returns 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Dependency pointing at a local mock.
pub fn dependency(name: &str, addr: SocketAddr, path: &str, extract: &str, output: &str, fallback: &str) -> DependencyConfig {
    DependencyConfig {
        name: name.into(),
        base_url: format!("http://{addr}"),
        path: path.into(),
        params: BTreeMap::new(),
        query: None,
        extract_field: extract.into(),
        output_field: output.into(),
        fallback: fallback.into(),
        breaker: None,
    }
}

/// Gateway config with the two standard dependencies pointed at local mocks.
pub fn gateway_config(post: SocketAddr, author: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.dependencies = vec![
        dependency("post", post, "/posts/1", "title", "post_title", "Unknown Title"),
        dependency("author", author, "/users/1", "name", "author_name", "Unknown Author"),
    ];
    config
}

/// Run the gateway on an ephemeral port. Returns its base URL and shutdown handle.
pub async fn start_gateway(config: GatewayConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{addr}"), shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
