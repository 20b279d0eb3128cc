//! catalogue-edge server binary.
//!
//! Boot order: logging, environment config, metrics exporter, listener,
//! upstream probe, HTTP server with graceful shutdown.

use catalogue_edge::observability::metrics;
use catalogue_edge::proxy::probe;
use catalogue_edge::{EdgeConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalogue_edge=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EdgeConfig::from_env();
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_bases = config.upstream.bases.len(),
        primary = config.upstream.primary().unwrap_or("(none)"),
        default_key_configured = config.credentials.default_key.is_some(),
        tenants = config.credentials.tenant_keys.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(probe::check_upstream(config.clone()));

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
