use crate::application::analysis::engine::AnalysisEngine;
use crate::domain::analysis::{AnalysisResult, Signal};
use crate::domain::errors::MarketDataError;
use crate::domain::market::MarketListing;
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisServiceConfig {
    /// Listings requested from upstream per pass
    pub listing_limit: usize,
    /// Leading listings that get analyzed
    pub top_n: usize,
    /// Trailing window of the price history, in days
    pub history_days: u32,
}

impl Default for AnalysisServiceConfig {
    fn default() -> Self {
        Self {
            listing_limit: 10,
            top_n: 5,
            history_days: 30,
        }
    }
}

/// Drives analysis passes: listings, then per-asset history, then the engine.
///
/// All upstream traffic goes through the provider (and so through the
/// broker); this service never sleeps or rate limits on its own.
pub struct AnalysisService {
    provider: Arc<dyn MarketDataProvider>,
    engine: AnalysisEngine,
    config: AnalysisServiceConfig,
    metrics: Option<Metrics>,
}

impl AnalysisService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        engine: AnalysisEngine,
        config: AnalysisServiceConfig,
    ) -> Self {
        Self {
            provider,
            engine,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One pass over the top listings.
    ///
    /// Fails only if the listing itself cannot be loaded. Assets with short
    /// history or a failed history fetch are left out, so the result may be
    /// shorter than `top_n`.
    pub async fn run_pass(&self) -> Result<Vec<AnalysisResult>, MarketDataError> {
        let listings = self.provider.top_markets(self.config.listing_limit).await?;
        info!(
            "AnalysisService: Analyzing top {} of {} listings",
            self.config.top_n.min(listings.len()),
            listings.len()
        );

        let mut results = Vec::with_capacity(self.config.top_n);
        for listing in listings.iter().take(self.config.top_n) {
            if let Some(result) = self.analyze_listing(listing).await {
                results.push(result);
            }
        }

        let count = |signal: Signal| results.iter().filter(|r| r.signal == signal).count();
        info!(
            "AnalysisService: Pass complete, {} results ({} long, {} short, {} hold)",
            results.len(),
            count(Signal::Long),
            count(Signal::Short),
            count(Signal::Hold),
        );
        Ok(results)
    }

    /// Manual refresh: drop cached responses, then run a pass
    pub async fn refresh(&self) -> Result<Vec<AnalysisResult>, MarketDataError> {
        info!("AnalysisService: Manual refresh requested");
        self.provider.invalidate_cache();
        self.run_pass().await
    }

    /// Analyze a single coin by upstream id.
    ///
    /// `Ok(None)` means the coin is unknown upstream or its history is too
    /// short.
    pub async fn analyze_coin(
        &self,
        coin_id: &str,
    ) -> Result<Option<AnalysisResult>, MarketDataError> {
        let listings = self
            .provider
            .markets_by_ids(&[coin_id.to_string()])
            .await?;

        let Some(listing) = listings.into_iter().find(|l| l.id == coin_id) else {
            warn!("AnalysisService: No market listing for {}", coin_id);
            return Ok(None);
        };

        let series = self
            .provider
            .price_history(&listing.id, self.config.history_days)
            .await?;

        match self.engine.analyze(&listing, &series) {
            Ok(result) => {
                self.record_signal(&result);
                Ok(Some(result))
            }
            Err(skip) => {
                warn!("AnalysisService: {}", skip);
                self.record_skip();
                Ok(None)
            }
        }
    }

    async fn analyze_listing(&self, listing: &MarketListing) -> Option<AnalysisResult> {
        info!("AnalysisService: Analyzing {}...", listing.name);

        let series = match self
            .provider
            .price_history(&listing.id, self.config.history_days)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                error!("AnalysisService: Error analyzing {}: {}", listing.name, e);
                self.record_skip();
                return None;
            }
        };

        match self.engine.analyze(listing, &series) {
            Ok(result) => {
                self.record_signal(&result);
                Some(result)
            }
            Err(skip) => {
                warn!("AnalysisService: {}", skip);
                self.record_skip();
                None
            }
        }
    }

    fn record_signal(&self, result: &AnalysisResult) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_signal(&result.signal.to_string().to_lowercase());
        }
    }

    fn record_skip(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.skipped_assets_total.inc();
        }
    }
}
