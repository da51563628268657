//! CoinGecko Market Data Service
//!
//! Implements `MarketDataProvider` on top of the request broker:
//! - Ranked listings (`/coins/markets`), optionally filtered by ids
//! - Daily price history (`/coins/{id}/market_chart`)
//!
//! Every request is cached under its path and query, so listings and
//! histories expire independently.

use super::models::{CoinMarketDto, MarketChartDto};
use crate::application::broker::backoff::{
    DEFAULT_RETRY_BUDGET, PRIMARY_INITIAL_DELAY, SECONDARY_INITIAL_DELAY,
};
use crate::application::broker::{FetchRequest, RequestBroker};
use crate::domain::errors::MarketDataError;
use crate::domain::market::{MarketListing, PriceSeries};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{build_url_with_query, cache_key_for};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_VS_CURRENCY: &str = "usd";

pub struct CoinGeckoMarketDataService {
    broker: Arc<RequestBroker>,
    base_url: String,
    vs_currency: String,
    retry_budget: u32,
    /// Backoff seed for listing requests
    primary_delay: Duration,
    /// Backoff seed for history requests
    secondary_delay: Duration,
}

impl CoinGeckoMarketDataService {
    pub fn builder() -> CoinGeckoMarketDataServiceBuilder {
        CoinGeckoMarketDataServiceBuilder::default()
    }

    pub fn broker(&self) -> &Arc<RequestBroker> {
        &self.broker
    }

    fn request<K, V>(&self, path: &str, params: &[(K, V)]) -> Result<FetchRequest, MarketDataError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = build_url_with_query(&self.base_url, path, params).map_err(|e| {
            MarketDataError::Transport {
                reason: e.to_string(),
            }
        })?;
        Ok(FetchRequest::new(url.as_str(), cache_key_for(&url)).retries(self.retry_budget))
    }

    fn markets_request(
        &self,
        per_page: usize,
        ids: Option<&[String]>,
    ) -> Result<FetchRequest, MarketDataError> {
        let mut params = vec![
            ("vs_currency", self.vs_currency.clone()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", "1".to_string()),
            ("sparkline", "false".to_string()),
        ];
        if let Some(ids) = ids {
            params.push(("ids", ids.join(",")));
        }
        Ok(self
            .request("coins/markets", &params)?
            .initial_delay(self.primary_delay))
    }

    fn chart_request(&self, coin_id: &str, days: u32) -> Result<FetchRequest, MarketDataError> {
        let params = [
            ("vs_currency", self.vs_currency.clone()),
            ("days", days.to_string()),
            ("interval", "daily".to_string()),
        ];
        Ok(self
            .request(&format!("coins/{}/market_chart", coin_id), &params)?
            .initial_delay(self.secondary_delay))
    }

    async fn fetch_markets(
        &self,
        request: FetchRequest,
    ) -> Result<Vec<MarketListing>, MarketDataError> {
        let rows: Vec<CoinMarketDto> = self.broker.fetch_json(request).await?;
        Ok(rows.into_iter().map(MarketListing::from).collect())
    }
}

#[derive(Default)]
pub struct CoinGeckoMarketDataServiceBuilder {
    broker: Option<Arc<RequestBroker>>,
    base_url: Option<String>,
    vs_currency: Option<String>,
    retry_budget: Option<u32>,
    primary_delay: Option<Duration>,
    secondary_delay: Option<Duration>,
}

impl CoinGeckoMarketDataServiceBuilder {
    pub fn broker(mut self, broker: Arc<RequestBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn vs_currency(mut self, vs_currency: String) -> Self {
        self.vs_currency = Some(vs_currency);
        self
    }

    pub fn retry_budget(mut self, retries: u32) -> Self {
        self.retry_budget = Some(retries);
        self
    }

    pub fn primary_delay(mut self, delay: Duration) -> Self {
        self.primary_delay = Some(delay);
        self
    }

    pub fn secondary_delay(mut self, delay: Duration) -> Self {
        self.secondary_delay = Some(delay);
        self
    }

    pub fn build(self) -> anyhow::Result<CoinGeckoMarketDataService> {
        let broker = self.broker.context("broker is required")?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let vs_currency = self
            .vs_currency
            .unwrap_or_else(|| DEFAULT_VS_CURRENCY.to_string());

        info!(
            "CoinGeckoMarketDataService: Using {} (vs_currency={})",
            base_url, vs_currency
        );

        Ok(CoinGeckoMarketDataService {
            broker,
            base_url,
            vs_currency,
            retry_budget: self.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET),
            primary_delay: self.primary_delay.unwrap_or(PRIMARY_INITIAL_DELAY),
            secondary_delay: self.secondary_delay.unwrap_or(SECONDARY_INITIAL_DELAY),
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoMarketDataService {
    async fn top_markets(&self, limit: usize) -> Result<Vec<MarketListing>, MarketDataError> {
        let request = self.markets_request(limit, None)?;
        debug!("CoinGeckoMarketDataService: Fetching top {} markets", limit);
        self.fetch_markets(request).await
    }

    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<MarketListing>, MarketDataError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.markets_request(ids.len(), Some(ids))?;
        debug!("CoinGeckoMarketDataService: Fetching markets for {:?}", ids);
        self.fetch_markets(request).await
    }

    async fn price_history(
        &self,
        coin_id: &str,
        days: u32,
    ) -> Result<PriceSeries, MarketDataError> {
        let request = self.chart_request(coin_id, days)?;
        debug!(
            "CoinGeckoMarketDataService: Fetching {}d history for {}",
            days, coin_id
        );
        let chart: MarketChartDto = self.broker.fetch_json(request).await?;
        Ok(PriceSeries::from(chart))
    }

    fn invalidate_cache(&self) {
        self.broker.invalidate_all();
    }
}
