use std::time::Duration;

/// Upper bound on any wait between attempts, hinted or computed.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Initial retry delay for primary data (market listings)
pub const PRIMARY_INITIAL_DELAY: Duration = Duration::from_millis(2000);

/// Initial retry delay for secondary, per-item data (price series)
pub const SECONDARY_INITIAL_DELAY: Duration = Duration::from_millis(1500);

/// Default number of retries per logical request
pub const DEFAULT_RETRY_BUDGET: u32 = 2;

/// How an upstream attempt failed. Drives retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429
    RateLimited,
    /// No HTTP response at all (refused, blocked, timed out)
    Transport,
    /// Any other non-2xx status
    UpstreamStatus,
    /// Response arrived but is not the expected JSON
    InvalidResponse,
}

/// Exponential backoff with an optional server-supplied override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
    max: Duration,
}

impl BackoffPolicy {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            max: MAX_BACKOFF,
        }
    }

    pub fn primary() -> Self {
        Self::new(PRIMARY_INITIAL_DELAY)
    }

    pub fn secondary() -> Self {
        Self::new(SECONDARY_INITIAL_DELAY)
    }

    /// Wait before retry number `attempt` (0-based).
    ///
    /// A server hint is clamped to `[0, 30s]` and used verbatim; otherwise
    /// the initial delay doubles per attempt up to the cap.
    pub fn next_delay(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint.min(self.max);
        }

        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Whether another attempt is allowed after `retries_used` retries.
    ///
    /// Transport failures get at most one retry regardless of budget; a
    /// connection that cannot be established rarely heals on repeat.
    pub fn should_retry(&self, class: FailureClass, retries_used: u32, budget: u32) -> bool {
        match class {
            FailureClass::RateLimited | FailureClass::UpstreamStatus => retries_used < budget,
            FailureClass::Transport => retries_used < budget.min(1),
            FailureClass::InvalidResponse => false,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::primary()
    }
}
