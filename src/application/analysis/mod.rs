pub mod engine;
pub mod indicators;
pub mod rules;
pub mod service;

pub use engine::{AnalysisEngine, EngineConfig};
pub use indicators::{rsi, sma};
pub use rules::{classify_signal, classify_trend};
pub use service::{AnalysisService, AnalysisServiceConfig};
