//! Upstream and broker configuration parsed from environment variables.

use super::parse_or;
use crate::application::broker::backoff::{
    DEFAULT_RETRY_BUDGET, PRIMARY_INITIAL_DELAY, SECONDARY_INITIAL_DELAY,
};
use crate::application::broker::quota::{
    DEFAULT_MAX_REQUESTS_PER_WINDOW, DEFAULT_MIN_SPACING, DEFAULT_TRACKED_HOST, QUOTA_WINDOW,
};
use crate::application::broker::{BrokerConfig, QuotaConfig};
use crate::infrastructure::coingecko::market_data::{DEFAULT_BASE_URL, DEFAULT_VS_CURRENCY};
use anyhow::Result;
use std::time::Duration;

/// Broker environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEnvConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub min_spacing: Duration,
    pub max_requests_per_minute: u32,
    /// Host the per-minute ceiling applies to
    pub tracked_host: String,
    pub max_retries: u32,
    pub primary_retry_delay: Duration,
    pub secondary_retry_delay: Duration,
    pub http_timeout: Duration,
}

impl Default for BrokerEnvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            min_spacing: DEFAULT_MIN_SPACING,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            tracked_host: DEFAULT_TRACKED_HOST.to_string(),
            max_retries: DEFAULT_RETRY_BUDGET,
            primary_retry_delay: PRIMARY_INITIAL_DELAY,
            secondary_retry_delay: SECONDARY_INITIAL_DELAY,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl BrokerEnvConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            base_url: lookup("COINGECKO_BASE_URL").unwrap_or(defaults.base_url),
            vs_currency: lookup("VS_CURRENCY").unwrap_or(defaults.vs_currency),
            min_spacing: Duration::from_millis(parse_or(
                lookup,
                "BROKER_MIN_SPACING_MS",
                defaults.min_spacing.as_millis() as u64,
            )?),
            max_requests_per_minute: parse_or(
                lookup,
                "BROKER_MAX_REQUESTS_PER_MINUTE",
                defaults.max_requests_per_minute,
            )?,
            tracked_host: lookup("BROKER_TRACKED_HOST").unwrap_or(defaults.tracked_host),
            max_retries: parse_or(lookup, "BROKER_MAX_RETRIES", defaults.max_retries)?,
            primary_retry_delay: Duration::from_millis(parse_or(
                lookup,
                "BROKER_PRIMARY_RETRY_DELAY_MS",
                defaults.primary_retry_delay.as_millis() as u64,
            )?),
            secondary_retry_delay: Duration::from_millis(parse_or(
                lookup,
                "BROKER_SECONDARY_RETRY_DELAY_MS",
                defaults.secondary_retry_delay.as_millis() as u64,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                lookup,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
        };

        if config.max_requests_per_minute == 0 {
            anyhow::bail!("BROKER_MAX_REQUESTS_PER_MINUTE must be at least 1");
        }
        Ok(config)
    }

    pub fn to_broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            quota: QuotaConfig {
                min_spacing: self.min_spacing,
                max_requests_per_window: self.max_requests_per_minute,
                window: QUOTA_WINDOW,
                tracked_host: self.tracked_host.clone(),
            },
        }
    }
}
