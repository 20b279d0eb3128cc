use thiserror::Error;

/// Failures on the forwarding path. All variants are recovered into a
/// generic 500 response at the service boundary; none crash the process.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("invalid outbound header value: {0}")]
    HeaderValue(#[from] axum::http::header::InvalidHeaderValue),
}
