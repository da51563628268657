use crate::domain::ports::{Transport, TransportResponse};
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::debug;

/// `Transport` over a shared reqwest client.
///
/// Non-2xx statuses are returned as responses, not errors, so the broker can
/// classify them.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
        }
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status().as_u16();
        let retry_after = retry_after(response.headers());
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;

        debug!("ReqwestTransport: GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}
