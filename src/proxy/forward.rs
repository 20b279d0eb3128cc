//! Upstream request execution with bounded redirect following.
//!
//! The client never follows redirects on its own; the follower re-issues
//! the original method, headers, and body at each hop so upstream
//! redirects stay transparent to the caller.

use bytes::Bytes;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use url::Url;

use super::error::ProxyError;

const REDIRECT_STATUSES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

pub struct UpstreamClient {
    http: Client,
    max_redirects: usize,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, ProxyError> {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            max_redirects,
        })
    }

    /// Issue a request, following up to `max_redirects` redirect hops.
    ///
    /// When the budget runs out while the upstream is still redirecting,
    /// the last response is returned as-is for the caller to relay. A
    /// redirect without a resolvable `Location` is likewise returned
    /// unchanged.
    pub async fn fetch(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, ProxyError> {
        let mut url = url;
        let mut hops = 0;
        loop {
            let mut request = self.http.request(method.clone(), url.clone()).headers(headers.clone());
            if let Some(bytes) = &body {
                request = request.body(bytes.clone());
            }
            let response = request.send().await?;

            if hops >= self.max_redirects || !REDIRECT_STATUSES.contains(&response.status()) {
                return Ok(response);
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
            else {
                return Ok(response);
            };
            let Ok(next) = url.join(location) else {
                tracing::warn!(location, "Unresolvable redirect location, relaying response");
                return Ok(response);
            };
            tracing::debug!(status = %response.status(), from = %url, to = %next, "Following upstream redirect");
            url = next;
            hops += 1;
        }
    }
}
