use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum gap between two consecutive upstream calls
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(3000);

/// Self-imposed ceiling, below the provider's published 30-50/minute
pub const DEFAULT_MAX_REQUESTS_PER_WINDOW: u32 = 25;

pub const QUOTA_WINDOW: Duration = Duration::from_secs(60);

pub const DEFAULT_TRACKED_HOST: &str = "api.coingecko.com";

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub min_spacing: Duration,
    pub max_requests_per_window: u32,
    pub window: Duration,
    /// Host the per-window ceiling applies to
    pub tracked_host: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            min_spacing: DEFAULT_MIN_SPACING,
            max_requests_per_window: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            window: QUOTA_WINDOW,
            tracked_host: DEFAULT_TRACKED_HOST.to_string(),
        }
    }
}

/// Request spacing and rolling quota, owned by the broker pump.
///
/// Spacing applies to every upstream call; the ceiling only counts calls to
/// the tracked host, over a sliding window.
#[derive(Debug)]
pub struct UpstreamQuotaState {
    config: QuotaConfig,
    last_request_at: Option<Instant>,
    recent_requests: VecDeque<Instant>,
}

impl UpstreamQuotaState {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            last_request_at: None,
            recent_requests: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    pub fn is_tracked(&self, url: &str) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(&self.config.tracked_host)))
            .unwrap_or(false)
    }

    /// Requests to the tracked host still inside the window as of `now`
    pub fn requests_in_window(&mut self, now: Instant) -> u32 {
        self.cleanup_old_timestamps(now);
        self.recent_requests.len() as u32
    }

    /// How long to wait before a call to `url` may be issued at `now`.
    pub fn delay_before_next(&mut self, url: &str, now: Instant) -> Duration {
        let spacing_wait = self
            .last_request_at
            .map(|last| (last + self.config.min_spacing).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        if !self.is_tracked(url) {
            return spacing_wait;
        }

        self.cleanup_old_timestamps(now);
        // A zero ceiling still admits one call per window
        let ceiling = self.config.max_requests_per_window.max(1) as usize;
        let quota_wait = if self.recent_requests.len() < ceiling {
            Duration::ZERO
        } else {
            // Wait until enough old requests leave the window to free one slot
            let excess = self.recent_requests.len() + 1 - ceiling;
            self.recent_requests
                .get(excess - 1)
                .map(|oldest| (*oldest + self.config.window).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO)
        };

        spacing_wait.max(quota_wait)
    }

    /// Record a call to `url` issued at `at`
    pub fn record_request(&mut self, url: &str, at: Instant) {
        self.last_request_at = Some(at);
        if self.is_tracked(url) {
            self.recent_requests.push_back(at);
        }
    }

    fn cleanup_old_timestamps(&mut self, now: Instant) {
        while let Some(&timestamp) = self.recent_requests.front() {
            if now.saturating_duration_since(timestamp) >= self.config.window {
                self.recent_requests.pop_front();
            } else {
                break;
            }
        }
    }
}
