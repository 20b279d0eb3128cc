//! Startup upstream connectivity probe.
//!
//! A one-shot, fire-and-forget check that the configured upstream answers
//! a minimal catalogue query. Results are logged only; serving never
//! depends on the outcome.

use reqwest::header::{HeaderName, HeaderValue, ACCEPT};

use crate::config::EdgeConfig;

pub async fn check_upstream(config: EdgeConfig) {
    let Some(base) = config.upstream.primary() else {
        tracing::warn!("No PUBLIC_API_BASE configured");
        return;
    };
    let url = match url::Url::parse(base).and_then(|b| b.join("/public/products")) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("per_page", "1");
            url
        }
        Err(error) => {
            tracing::warn!(base, %error, "Upstream base is not a valid URL");
            return;
        }
    };

    let client = match reqwest::Client::builder().timeout(config.upstream.timeout).build() {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(%error, "Could not build probe client");
            return;
        }
    };

    let mut request = client.get(url).header(ACCEPT, "application/json");
    if let Some(key) = &config.credentials.default_key {
        let value = format!("{}{}", config.credentials.key_prefix, key);
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(config.credentials.header_name.as_str()),
            HeaderValue::from_str(&value),
        ) {
            request = request.header(name, value);
        }
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!(base, "Connection to upstream API base succeeded");
        }
        Ok(response) => {
            tracing::warn!(base, status = %response.status(), "Upstream API base answered with non-success");
        }
        Err(error) => {
            tracing::warn!(base, %error, "Could not reach upstream API base");
        }
    }
}
