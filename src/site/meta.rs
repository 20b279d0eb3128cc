//! HTML meta injection.
//!
//! Served pages advertise where the browser should send catalogue calls
//! via `<meta name="public-api-base">`. When a credential is configured
//! the advertised base is `/proxy`, so keys never reach the client.

use regex::Regex;

use crate::config::EdgeConfig;

pub struct MetaInjector {
    tag: String,
    existing: Regex,
    head: Regex,
}

impl MetaInjector {
    pub fn new(client_base: &str) -> Self {
        Self {
            tag: format!(r#"<meta name="public-api-base" content="{}">"#, client_base),
            existing: Regex::new(r#"(?i)<meta\s+name="public-api-base"[^>]*>"#)
                .expect("hard-coded regex"),
            head: Regex::new(r"(?i)<head\b[^>]*>").expect("hard-coded regex"),
        }
    }

    /// Inject the API-base meta tag right after the opening `<head>`,
    /// removing any pre-existing tag first. Pages without a `<head>` are
    /// returned unchanged (minus any stale tag).
    pub fn inject(&self, html: &str) -> String {
        let stripped = self.existing.replace_all(html, "");
        match self.head.find(&stripped) {
            Some(head) => format!(
                "{}\n    {}{}",
                &stripped[..head.end()],
                self.tag,
                &stripped[head.end()..]
            ),
            None => stripped.into_owned(),
        }
    }
}

/// The API base the browser should use: the proxy mount when any
/// credential is configured, otherwise the upstream base directly.
pub fn client_api_base(config: &EdgeConfig) -> String {
    if config.credentials.any_configured() {
        "/proxy".to_string()
    } else {
        config.upstream.primary().unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injects_after_opening_head() {
        let injector = MetaInjector::new("/proxy");
        let html = "<html><head><title>t</title></head><body></body></html>";
        let injected = injector.inject(html);
        assert!(injected.contains(
            "<head>\n    <meta name=\"public-api-base\" content=\"/proxy\"><title>t</title>"
        ));
    }

    #[test]
    fn test_replaces_existing_tag() {
        let injector = MetaInjector::new("/proxy");
        let html = r#"<head><meta name="public-api-base" content="https://old.example.com"></head>"#;
        let injected = injector.inject(html);
        assert!(!injected.contains("old.example.com"));
        assert_eq!(injected.matches("public-api-base").count(), 1);
    }

    #[test]
    fn test_head_with_attributes() {
        let injector = MetaInjector::new("/proxy");
        let injected = injector.inject(r#"<head lang="en"><title>t</title></head>"#);
        assert!(injected.contains(r#"<head lang="en">"#));
        assert!(injected.contains(r#"content="/proxy""#));
    }

    #[test]
    fn test_page_without_head_is_unchanged() {
        let injector = MetaInjector::new("/proxy");
        assert_eq!(injector.inject("<p>fragment</p>"), "<p>fragment</p>");
    }

    #[test]
    fn test_client_base_prefers_proxy_when_keyed() {
        let mut config = EdgeConfig::default();
        config.upstream.bases = vec!["https://api.example.com".to_string()];
        assert_eq!(client_api_base(&config), "https://api.example.com");

        config.credentials.default_key = Some("k".to_string());
        assert_eq!(client_api_base(&config), "/proxy");
    }
}
