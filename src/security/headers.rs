//! Security response headers.
//!
//! # Responsibilities
//! - Build the Content-Security-Policy from the configured upstream bases
//! - Relax script/style inline rules only for localhost development
//!
//! # Design Decisions
//! - The policy is assembled once at startup; headers are applied with
//!   if-not-present semantics so a handler can override them

use axum::http::HeaderValue;

use crate::config::EdgeConfig;

/// Assemble the CSP string for this deployment.
pub fn content_security_policy(config: &EdgeConfig) -> String {
    let bases = &config.upstream.bases;
    let local_dev = is_local_dev(bases);

    let mut connect_src = vec!["'self'".to_string()];
    connect_src.extend(bases.iter().cloned());

    let mut script_src = vec!["'self'".to_string()];
    let mut style_src = vec![
        "'self'".to_string(),
        "https://fonts.googleapis.com".to_string(),
        "https://cdnjs.cloudflare.com".to_string(),
    ];
    if local_dev {
        script_src.push("'unsafe-inline'".to_string());
        style_src.push("'unsafe-inline'".to_string());
    }

    [
        "default-src 'self'".to_string(),
        format!("connect-src {}", connect_src.join(" ")),
        format!("script-src {}", script_src.join(" ")),
        format!("style-src {}", style_src.join(" ")),
        "font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com data:".to_string(),
        "img-src 'self' data: https://*".to_string(),
        "object-src 'none'".to_string(),
        "frame-src 'self' https://www.google.com".to_string(),
    ]
    .join("; ")
}

/// The CSP as a header value; falls back to a minimal policy if the
/// configured bases produce an invalid header.
pub fn csp_header_value(config: &EdgeConfig) -> HeaderValue {
    HeaderValue::from_str(&content_security_policy(config))
        .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"))
}

fn is_local_dev(bases: &[String]) -> bool {
    bases.iter().any(|base| {
        base.contains("localhost") || base.contains("127.0.0.1") || base.contains("::1")
    })
}
