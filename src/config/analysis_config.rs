//! Analysis pass configuration parsed from environment variables.

use super::parse_or;
use crate::application::analysis::{AnalysisServiceConfig, EngineConfig};
use anyhow::Result;
use std::time::Duration;

/// Analysis environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEnvConfig {
    pub top_n: usize,
    pub listing_limit: usize,
    pub history_days: u32,
    pub min_history: usize,
    /// Pause between passes in `watch` mode
    pub refresh_interval: Duration,
}

impl Default for AnalysisEnvConfig {
    fn default() -> Self {
        let service = AnalysisServiceConfig::default();
        Self {
            top_n: service.top_n,
            listing_limit: service.listing_limit,
            history_days: service.history_days,
            min_history: EngineConfig::default().min_history,
            refresh_interval: Duration::from_secs(300),
        }
    }
}

impl AnalysisEnvConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            top_n: parse_or(lookup, "ANALYSIS_TOP_N", defaults.top_n)?,
            listing_limit: parse_or(lookup, "ANALYSIS_LISTING_LIMIT", defaults.listing_limit)?,
            history_days: parse_or(lookup, "ANALYSIS_HISTORY_DAYS", defaults.history_days)?,
            min_history: parse_or(lookup, "ANALYSIS_MIN_HISTORY", defaults.min_history)?,
            refresh_interval: Duration::from_secs(parse_or(
                lookup,
                "ANALYSIS_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval.as_secs(),
            )?),
        };

        if config.top_n > config.listing_limit {
            anyhow::bail!(
                "ANALYSIS_TOP_N ({}) cannot exceed ANALYSIS_LISTING_LIMIT ({})",
                config.top_n,
                config.listing_limit
            );
        }
        Ok(config)
    }

    pub fn to_service_config(&self) -> AnalysisServiceConfig {
        AnalysisServiceConfig {
            listing_limit: self.listing_limit,
            top_n: self.top_n,
            history_days: self.history_days,
        }
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_history: self.min_history,
            ..EngineConfig::default()
        }
    }
}
