//! Static site serving.
//!
//! # Responsibilities
//! - Serve `/static/*` assets with content-type-aware cache headers
//! - Serve pretty URLs: extensionless `GET /foo` -> `<root>/foo.html`
//! - Redirect legacy `.html` URLs to their pretty form
//! - Inject the API-base meta tag into every served page
//!
//! # Design Decisions
//! - Page paths are rebuilt from normal components only, so `..` and
//!   absolute segments can never escape the site root
//! - HTML is always `Cache-Control: no-cache`; the injected meta must
//!   reflect the current configuration

pub mod meta;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::EdgeConfig;
use crate::security;

use meta::MetaInjector;

#[derive(Clone)]
struct SiteState {
    root: PathBuf,
    injector: Arc<MetaInjector>,
}

/// Build the site router: static assets, pretty pages, security headers.
pub fn router(config: &EdgeConfig) -> Router {
    let state = SiteState {
        root: config.site.root.clone(),
        injector: Arc::new(MetaInjector::new(&meta::client_api_base(config))),
    };
    let assets: Router = Router::new()
        .fallback_service(ServeDir::new(config.site.root.join("static")))
        .layer(middleware::map_response(asset_cache_control));

    Router::new()
        .nest_service("/static", assets)
        .fallback(serve_page)
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            security::headers::csp_header_value(config),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

/// JSON data files revalidate sooner than other static assets; HTML is
/// left alone (pages set no-cache themselves).
async fn asset_cache_control(response: Response) -> Response {
    if !response.status().is_success() {
        return response;
    }
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type.contains("text/html") {
        return response;
    }
    let max_age = if content_type.contains("application/json") {
        HeaderValue::from_static("public, max-age=300")
    } else {
        HeaderValue::from_static("public, max-age=3600")
    };
    let mut response = response;
    response.headers_mut().insert(header::CACHE_CONTROL, max_age);
    response
}

async fn serve_page(State(state): State<SiteState>, request: Request<Body>) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return not_found();
    }
    let path = request.uri().path();

    // Legacy .html URLs get a permanent redirect to the pretty route.
    if let Some(pretty) = strip_html_suffix(path) {
        let location = match request.uri().query() {
            Some(query) => format!("{}?{}", pretty, query),
            None => pretty,
        };
        return match HeaderValue::from_str(&location) {
            Ok(location) => {
                (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
            }
            Err(_) => not_found(),
        };
    }
    if Path::new(path).extension().is_some() {
        return not_found();
    }

    let Some(candidate) = page_candidate(path) else {
        return not_found();
    };
    match tokio::fs::read_to_string(state.root.join(candidate)).await {
        Ok(html) => html_page(state.injector.inject(&html)),
        Err(_) => not_found(),
    }
}

fn strip_html_suffix(path: &str) -> Option<String> {
    if path.len() > 5 && path.to_ascii_lowercase().ends_with(".html") {
        let pretty = &path[..path.len() - 5];
        Some(if pretty.is_empty() { "/".to_string() } else { pretty.to_string() })
    } else {
        None
    }
}

/// Map a pretty URL onto a relative HTML file path. Only normal path
/// components are accepted; anything else stays inside the 404 branch.
fn page_candidate(path: &str) -> Option<PathBuf> {
    if path == "/" {
        return Some(PathBuf::from("index.html"));
    }
    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }
    let mut file = relative.into_os_string();
    file.push(".html");
    Some(PathBuf::from(file))
}

fn html_page(html: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        html,
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404: File not found").into_response()
}
