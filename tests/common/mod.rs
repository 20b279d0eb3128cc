//! Shared helpers for integration tests.
#![allow(dead_code)]

use axum::Router;
use catalogue_edge::{EdgeConfig, HttpServer, Shutdown};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Start a mock upstream on an ephemeral port.
pub async fn spawn_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start the edge server on an ephemeral port.
pub async fn spawn_proxy(config: EdgeConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let server = HttpServer::new(config).expect("server should build");
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    (addr, shutdown)
}

/// A config pointing at the given mock upstream.
pub fn config_for(upstream: Option<SocketAddr>) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    if let Some(addr) = upstream {
        config.upstream.bases = vec![format!("http://{}", addr)];
    }
    config
}

/// Non-pooled client that never follows redirects on its own.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
