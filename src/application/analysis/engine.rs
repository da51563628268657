use crate::application::analysis::indicators::{DEFAULT_RSI_PERIOD, rsi, sma};
use crate::application::analysis::rules::{classify_signal, classify_trend};
use crate::domain::analysis::AnalysisResult;
use crate::domain::errors::InsufficientHistory;
use crate::domain::market::{MarketListing, PriceSeries};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub fast_sma_period: usize,
    pub slow_sma_period: usize,
    pub rsi_period: usize,
    /// Shorter series are skipped rather than analyzed
    pub min_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fast_sma_period: 20,
            slow_sma_period: 50,
            rsi_period: DEFAULT_RSI_PERIOD,
            min_history: 20,
        }
    }
}

/// Stateless analysis over one listing and its price history.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        listing: &MarketListing,
        series: &PriceSeries,
    ) -> Result<AnalysisResult, InsufficientHistory> {
        self.analyze_at(listing, series, Utc::now())
    }

    /// Same as `analyze` with an explicit timestamp, for reproducible output
    pub fn analyze_at(
        &self,
        listing: &MarketListing,
        series: &PriceSeries,
        computed_at: DateTime<Utc>,
    ) -> Result<AnalysisResult, InsufficientHistory> {
        if series.len() < self.config.min_history {
            return Err(InsufficientHistory {
                coin_id: listing.id.clone(),
                points: series.len(),
                required: self.config.min_history,
            });
        }

        let prices = series.prices();
        let sma20 = sma(&prices, self.config.fast_sma_period);
        let sma50 = sma(&prices, self.config.slow_sma_period);
        let rsi = rsi(&prices, self.config.rsi_period);

        // Signals use the live listing price, not the last series sample
        let price = listing.current_price;
        let change_24h = listing.price_change_percentage_24h;
        let decision = classify_signal(price, sma20, sma50, rsi, change_24h);
        let trend = classify_trend(price, sma20, sma50, change_24h);

        Ok(AnalysisResult {
            coin_id: listing.id.clone(),
            name: listing.name.clone(),
            price,
            price_change_24h: change_24h,
            sma20,
            sma50,
            rsi,
            signal: decision.signal,
            signal_reason: decision.reason.to_string(),
            trend,
            volume: listing.total_volume,
            market_cap: listing.market_cap,
            computed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Signal, Trend};

    fn listing(price: f64, change: f64) -> MarketListing {
        MarketListing {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            current_price: price,
            price_change_percentage_24h: change,
            market_cap: 1.0e12,
            total_volume: 3.0e10,
            market_cap_rank: Some(1),
        }
    }

    fn series(prices: impl IntoIterator<Item = f64>) -> PriceSeries {
        PriceSeries::from_pairs(
            prices
                .into_iter()
                .enumerate()
                .map(|(i, p)| (i as i64 * 86_400_000, p)),
        )
    }

    #[test]
    fn test_short_history_is_skipped() {
        let engine = AnalysisEngine::default();
        let result = engine.analyze(&listing(100.0, 0.0), &series((0..19).map(|i| i as f64)));

        let skip = result.unwrap_err();
        assert_eq!(skip.points, 19);
        assert_eq!(skip.required, 20);
        assert_eq!(skip.coin_id, "bitcoin");
    }

    #[test]
    fn test_rising_market_goes_long() {
        let engine = AnalysisEngine::default();
        // 60 daily closes rising 1/day: no losses -> RSI 100 (overbought)
        let history = series((0..60).map(|i| 100.0 + i as f64));
        let result = engine.analyze(&listing(170.0, 6.0), &history).unwrap();

        assert!((result.sma20 - 149.5).abs() < 1e-9);
        assert!((result.sma50 - 134.5).abs() < 1e-9);
        assert_eq!(result.rsi, 100.0);
        // Overbought uptrend: long rules need RSI <= 70, short rules need price below an SMA
        assert_eq!(result.signal, Signal::Hold);
        assert_eq!(result.trend, Trend::StrongUp);
    }

    #[test]
    fn test_sma50_degenerates_on_thirty_points() {
        let engine = AnalysisEngine::default();
        let history = series((0..30).map(|i| 10.0 + i as f64));
        let result = engine.analyze(&listing(50.0, 1.0), &history).unwrap();

        // Fewer than 50 points: SMA50 falls back to the latest price
        assert_eq!(result.sma50, 39.0);
        assert!((result.sma20 - 29.5).abs() < 1e-9);
    }

    #[test]
    fn test_result_carries_listing_fields() {
        let engine = AnalysisEngine::default();
        let at = Utc::now();
        let history = series(std::iter::repeat_n(100.0, 25));
        let result = engine
            .analyze_at(&listing(100.0, 0.0), &history, at)
            .unwrap();

        assert_eq!(result.name, "Bitcoin");
        assert_eq!(result.market_cap, 1.0e12);
        assert_eq!(result.volume, 3.0e10);
        assert_eq!(result.computed_at, at);
        assert_eq!(result.signal, Signal::Hold);
        assert_eq!(result.signal_reason, "no clear signal");
        assert_eq!(result.trend, Trend::Neutral);
    }
}
