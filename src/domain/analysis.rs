use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional trade signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Long,
    Short,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongUp,
    Up,
    Neutral,
    Down,
    StrongDown,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::StrongUp => write!(f, "strong_up"),
            Trend::Up => write!(f, "up"),
            Trend::Neutral => write!(f, "neutral"),
            Trend::Down => write!(f, "down"),
            Trend::StrongDown => write!(f, "strong_down"),
        }
    }
}

/// Outcome of the signal decision table: the signal plus the rule's reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDecision {
    pub signal: Signal,
    pub reason: &'static str,
}

/// One analysis pass for one asset. Superseded, never mutated, by the next pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub coin_id: String,
    pub name: String,
    pub price: f64,
    pub price_change_24h: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub rsi: f64,
    pub signal: Signal,
    pub signal_reason: String,
    pub trend: Trend,
    pub volume: f64,
    pub market_cap: f64,
    pub computed_at: DateTime<Utc>,
}
