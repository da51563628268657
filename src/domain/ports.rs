use crate::domain::errors::MarketDataError;
use crate::domain::market::{MarketListing, PriceSeries};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Raw upstream reply as seen by the request broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Server-supplied wait hint (`Retry-After`), if any
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound GET used by the broker.
///
/// `Err` means the call never produced an HTTP response (connection refused,
/// blocked, timed out). Any HTTP status, including 429, is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Top assets by market cap, ranked
    async fn top_markets(&self, limit: usize) -> Result<Vec<MarketListing>, MarketDataError>;

    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<MarketListing>, MarketDataError>;

    /// Daily price samples over the trailing `days`
    async fn price_history(&self, coin_id: &str, days: u32)
    -> Result<PriceSeries, MarketDataError>;

    /// Drop cached responses so the next call goes upstream
    fn invalidate_cache(&self);
}
