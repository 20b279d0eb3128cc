//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router with the proxy mount and the site routes
//! - Wire up middleware (request IDs, tracing, inbound timeout, CORS)
//! - Run the server with graceful shutdown

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::MakeRequestUuid;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tower_http::ServiceBuilderExt;

use crate::config::EdgeConfig;
use crate::proxy::credentials::TENANT_HEADER;
use crate::proxy::{ProxyError, ProxyService};
use crate::site;

/// Forwarded bodies are buffered; anything larger is rejected up front.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService>,
}

/// HTTP server for the edge: proxy mount plus static site.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: EdgeConfig) -> Result<Self, ProxyError> {
        let proxy = Arc::new(ProxyService::new(&config)?);
        let cors = cors_layer(proxy.credential_header().clone());
        let state = AppState { proxy };

        let proxy_routes = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .layer(cors)
            .with_state(state);

        let router = Router::new()
            .nest("/proxy", proxy_routes)
            .merge(site::router(&config))
            .layer(
                ServiceBuilder::new()
                    .set_x_request_id(MakeRequestUuid)
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(config.listener.request_timeout))
                    .propagate_x_request_id(),
            );

        Ok(Self { router })
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// CORS for the proxy mount: browsers call it cross-origin from dev
/// setups, with credentials and the custom key/tenant headers allowed.
fn cors_layer(credential_header: HeaderName) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(vec![
            header::CONTENT_TYPE,
            credential_header,
            TENANT_HEADER,
            header::AUTHORIZATION,
        ])
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "Failed to buffer inbound body");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "Request body too large" })),
            )
                .into_response();
        }
    };
    state
        .proxy
        .forward(
            &parts.method,
            parts.uri.path(),
            parts.uri.query(),
            &parts.headers,
            body,
        )
        .await
}
