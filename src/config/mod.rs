//! Configuration module for coinpulse.
//!
//! Structured configuration loaded from environment variables, split into
//! the broker (upstream access) and analysis sections. Unset variables take
//! their defaults; malformed values are errors.

mod analysis_config;
mod broker_config;

pub use analysis_config::AnalysisEnvConfig;
pub use broker_config::BrokerEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub broker: BrokerEnvConfig,
    pub analysis: AnalysisEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let broker =
            BrokerEnvConfig::from_lookup(&lookup).context("Failed to load broker config")?;
        let analysis =
            AnalysisEnvConfig::from_lookup(&lookup).context("Failed to load analysis config")?;
        Ok(Self { broker, analysis })
    }
}

pub(crate) fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        _ => Ok(default),
    }
}
