use thiserror::Error;

/// Errors surfaced by the market data path (broker and provider adapters).
///
/// Cloneable so a single upstream outcome can be fanned out to every caller
/// waiting on the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketDataError {
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Invalid response shape: {reason}")]
    InvalidResponseShape { reason: String },

    #[error("Upstream returned HTTP {status} after {attempts} attempts")]
    UpstreamStatus { status: u16, attempts: u32 },

    #[error("Request broker is no longer running")]
    BrokerClosed,
}

impl MarketDataError {
    /// Whether a last-known cached value may be served in place of this error.
    ///
    /// Malformed payloads never fall back: the data we hold could be the
    /// same malformed data.
    pub fn allows_stale_fallback(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Transport { .. } | Self::UpstreamStatus { .. }
        )
    }
}

/// Raised when a price series is too short to analyze.
///
/// Not a failure: the analysis pass skips the asset and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Insufficient history for {coin_id}: {points} points < {required} required")]
pub struct InsufficientHistory {
    pub coin_id: String,
    pub points: usize,
    pub required: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_formatting() {
        let error = MarketDataError::RateLimitExceeded { attempts: 3 };
        assert!(error.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_stale_fallback_eligibility() {
        assert!(MarketDataError::RateLimitExceeded { attempts: 3 }.allows_stale_fallback());
        assert!(
            MarketDataError::Transport {
                reason: "connection refused".to_string()
            }
            .allows_stale_fallback()
        );
        assert!(
            MarketDataError::UpstreamStatus {
                status: 503,
                attempts: 3
            }
            .allows_stale_fallback()
        );
        assert!(
            !MarketDataError::InvalidResponseShape {
                reason: "missing prices".to_string()
            }
            .allows_stale_fallback()
        );
        assert!(!MarketDataError::BrokerClosed.allows_stale_fallback());
    }

    #[test]
    fn test_insufficient_history_formatting() {
        let skip = InsufficientHistory {
            coin_id: "pepe".to_string(),
            points: 12,
            required: 20,
        };

        let msg = skip.to_string();
        assert!(msg.contains("pepe"));
        assert!(msg.contains("12"));
        assert!(msg.contains("20"));
    }
}
