// Indicator math, signal rules and the analysis pass
pub mod analysis;

// Single-flight request broker with pacing and retries
pub mod broker;

// Response cache shared by broker callers
pub mod market_data;

pub mod meme_coins;
