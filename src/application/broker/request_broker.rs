use crate::application::broker::backoff::{
    BackoffPolicy, DEFAULT_RETRY_BUDGET, FailureClass, PRIMARY_INITIAL_DELAY,
};
use crate::application::broker::quota::{QuotaConfig, UpstreamQuotaState};
use crate::application::market_data::response_cache::ResponseCache;
use crate::domain::errors::MarketDataError;
use crate::domain::ports::{Transport, TransportResponse};
use crate::infrastructure::observability::Metrics;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    pub quota: QuotaConfig,
}

/// One logical read: where to get it, where to cache it, how hard to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub cache_key: String,
    pub retries: u32,
    pub initial_delay: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, cache_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_key: cache_key.into(),
            retries: DEFAULT_RETRY_BUDGET,
            initial_delay: PRIMARY_INITIAL_DELAY,
        }
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }
}

/// Lifecycle of a queued request inside the pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Queued,
    InFlight,
    Retrying,
    Succeeded,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Queued => write!(f, "Queued"),
            RequestState::InFlight => write!(f, "InFlight"),
            RequestState::Retrying => write!(f, "Retrying"),
            RequestState::Succeeded => write!(f, "Succeeded"),
            RequestState::Failed => write!(f, "Failed"),
        }
    }
}

type FetchOutcome = Result<Value, MarketDataError>;
type Completion = oneshot::Sender<FetchOutcome>;

struct QueuedRequest {
    id: Uuid,
    url: String,
    cache_key: String,
    retry_budget: u32,
    policy: BackoffPolicy,
    enqueued_at: Instant,
}

impl From<FetchRequest> for QueuedRequest {
    fn from(request: FetchRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: request.url,
            cache_key: request.cache_key,
            retry_budget: request.retries,
            policy: BackoffPolicy::new(request.initial_delay),
            enqueued_at: Instant::now(),
        }
    }
}

/// A failed attempt, before the retry decision
struct AttemptFailure {
    class: FailureClass,
    status: Option<u16>,
    hint: Option<Duration>,
    reason: String,
}

impl AttemptFailure {
    fn from_response(response: &TransportResponse) -> Self {
        let class = if response.status == 429 {
            FailureClass::RateLimited
        } else {
            FailureClass::UpstreamStatus
        };
        Self {
            class,
            status: Some(response.status),
            hint: response.retry_after,
            reason: format!("HTTP {}", response.status),
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self.class {
            FailureClass::RateLimited => "rate_limited",
            FailureClass::Transport => "transport",
            FailureClass::UpstreamStatus => "upstream_status",
            FailureClass::InvalidResponse => "invalid_response",
        }
    }

    fn into_error(self, attempts: u32) -> MarketDataError {
        match self.class {
            FailureClass::RateLimited => MarketDataError::RateLimitExceeded { attempts },
            FailureClass::Transport => MarketDataError::Transport {
                reason: self.reason,
            },
            FailureClass::UpstreamStatus => MarketDataError::UpstreamStatus {
                status: self.status.unwrap_or_default(),
                attempts,
            },
            FailureClass::InvalidResponse => MarketDataError::InvalidResponseShape {
                reason: self.reason,
            },
        }
    }
}

/// State shared between callers and the pump
struct BrokerShared {
    cache: ResponseCache,
    /// Completion handles per cache key; one queued request per key
    pending: Mutex<HashMap<String, Vec<Completion>>>,
    metrics: Metrics,
}

impl BrokerShared {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, Vec<Completion>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("RequestBroker: Pending table lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Single-flight, rate-limited gateway to the upstream data provider.
///
/// Every upstream call goes through one pump task: at most one call is in
/// flight, calls are spaced, and the tracked host's per-window ceiling is
/// honored regardless of how many callers are waiting. Concurrent fetches
/// for the same cache key share one queued request.
///
/// Must be created inside a Tokio runtime; the pump stops once the broker is
/// dropped and its queue drains.
pub struct RequestBroker {
    shared: Arc<BrokerShared>,
    queue_tx: mpsc::UnboundedSender<QueuedRequest>,
}

impl RequestBroker {
    pub fn new(transport: Arc<dyn Transport>, config: BrokerConfig, metrics: Metrics) -> Self {
        Self::with_cache(transport, config, metrics, ResponseCache::new())
    }

    pub fn with_cache(
        transport: Arc<dyn Transport>,
        config: BrokerConfig,
        metrics: Metrics,
        cache: ResponseCache,
    ) -> Self {
        let shared = Arc::new(BrokerShared {
            cache,
            pending: Mutex::new(HashMap::new()),
            metrics,
        });
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let pump = BrokerPump {
            queue_rx,
            transport,
            shared: shared.clone(),
            quota: UpstreamQuotaState::new(config.quota),
        };
        tokio::spawn(pump.run());

        Self { shared, queue_tx }
    }

    /// Fetch JSON for `request`, from cache if fresh, otherwise via the pump.
    pub async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        if let Some(value) = self.shared.cache.get(&request.cache_key) {
            self.shared.metrics.cache_hits_total.inc();
            debug!("RequestBroker: Cache hit for {}", request.cache_key);
            return Ok(value);
        }

        let receiver = {
            let mut pending = self.shared.lock_pending();

            // The pump writes the cache before clearing the pending entry
            if let Some(value) = self.shared.cache.get(&request.cache_key) {
                self.shared.metrics.cache_hits_total.inc();
                return Ok(value);
            }

            let (tx, rx) = oneshot::channel();
            if let Some(waiters) = pending.get_mut(&request.cache_key) {
                waiters.push(tx);
                self.shared.metrics.single_flight_joins_total.inc();
                debug!(
                    "RequestBroker: Joined in-flight request for {} ({} waiters)",
                    request.cache_key,
                    waiters.len()
                );
            } else {
                let key = request.cache_key.clone();
                let queued = QueuedRequest::from(request);
                debug!(
                    "RequestBroker: [{}] {} for {}",
                    queued.id,
                    RequestState::Queued,
                    queued.url
                );
                if self.queue_tx.send(queued).is_err() {
                    return Err(MarketDataError::BrokerClosed);
                }
                pending.insert(key, vec![tx]);
                self.shared.metrics.queue_depth.inc();
            }
            rx
        };

        receiver.await.unwrap_or(Err(MarketDataError::BrokerClosed))
    }

    /// Fetch and decode into `T`.
    ///
    /// A payload that does not match `T` is dropped from the cache and
    /// reported as `InvalidResponseShape`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: FetchRequest,
    ) -> Result<T, MarketDataError> {
        let key = request.cache_key.clone();
        let value = self.fetch(request).await?;

        serde_json::from_value(value).map_err(|e| {
            self.shared.cache.invalidate(&key);
            self.shared.metrics.inc_upstream("invalid_response");
            warn!("RequestBroker: Discarding malformed payload for {}: {}", key, e);
            MarketDataError::InvalidResponseShape {
                reason: e.to_string(),
            }
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.shared.cache
    }

    pub fn invalidate(&self, cache_key: &str) -> bool {
        self.shared.cache.invalidate(cache_key)
    }

    pub fn invalidate_all(&self) {
        info!("RequestBroker: Invalidating all cached responses");
        self.shared.cache.clear();
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Distinct cache keys currently queued or in flight
    pub fn pending_requests(&self) -> usize {
        self.shared.lock_pending().len()
    }
}

/// The only task allowed to call upstream or sleep on spacing, quota and backoff.
struct BrokerPump {
    queue_rx: mpsc::UnboundedReceiver<QueuedRequest>,
    transport: Arc<dyn Transport>,
    shared: Arc<BrokerShared>,
    quota: UpstreamQuotaState,
}

impl BrokerPump {
    async fn run(mut self) {
        info!(
            "RequestBroker: Pump started (spacing: {:?}, limit: {} req/{:?} to {})",
            self.quota.config().min_spacing,
            self.quota.config().max_requests_per_window,
            self.quota.config().window,
            self.quota.config().tracked_host
        );

        while let Some(request) = self.queue_rx.recv().await {
            let outcome = self.execute(&request).await;
            self.complete(request, outcome);
        }

        info!("RequestBroker: Queue closed, pump stopped");
    }

    async fn execute(&mut self, request: &QueuedRequest) -> FetchOutcome {
        let mut retries_used: u32 = 0;

        loop {
            self.wait_for_slot(&request.url).await;

            let attempt = retries_used + 1;
            debug!(
                "RequestBroker: [{}] {} attempt {} for {}",
                request.id,
                RequestState::InFlight,
                attempt,
                request.url
            );

            let started = Instant::now();
            let result = self.transport.get(&request.url).await;
            self.shared
                .metrics
                .upstream_latency_seconds
                .observe(started.elapsed().as_secs_f64());

            let failure = match result {
                Ok(response) if response.is_success() => {
                    match serde_json::from_str::<Value>(&response.body) {
                        Ok(value) => {
                            self.shared.metrics.inc_upstream("success");
                            return Ok(value);
                        }
                        Err(e) => AttemptFailure {
                            class: FailureClass::InvalidResponse,
                            status: Some(response.status),
                            hint: None,
                            reason: format!("body is not JSON: {}", e),
                        },
                    }
                }
                Ok(response) => AttemptFailure::from_response(&response),
                Err(e) => AttemptFailure {
                    class: FailureClass::Transport,
                    status: None,
                    hint: None,
                    reason: format!("{:#}", e),
                },
            };
            self.shared.metrics.inc_upstream(failure.outcome_label());

            if !request
                .policy
                .should_retry(failure.class, retries_used, request.retry_budget)
            {
                warn!(
                    "RequestBroker: [{}] {} after {} attempts for {}: {}",
                    request.id,
                    RequestState::Failed,
                    attempt,
                    request.url,
                    failure.reason
                );
                return Err(failure.into_error(attempt));
            }

            let delay = request.policy.next_delay(retries_used, failure.hint);
            retries_used += 1;
            self.shared.metrics.retries_total.inc();
            warn!(
                "RequestBroker: [{}] {} {} in {:?} ({} retries left): {}",
                request.id,
                RequestState::Retrying,
                request.url,
                delay,
                request.retry_budget - retries_used,
                failure.reason
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleep out spacing and quota, then claim the slot
    async fn wait_for_slot(&mut self, url: &str) {
        let now = Instant::now();
        let wait = self.quota.delay_before_next(url, now);

        if !wait.is_zero() {
            let in_window = self.quota.requests_in_window(now);
            if in_window >= self.quota.config().max_requests_per_window {
                warn!(
                    "RequestBroker: Approaching rate limit ({} requests in window). Waiting {}s...",
                    in_window,
                    wait.as_secs_f64().ceil()
                );
            } else {
                debug!("RequestBroker: Spacing requests, waiting {:?}", wait);
            }
            tokio::time::sleep(wait).await;
        }

        self.quota.record_request(url, Instant::now());
    }

    /// Write through to the cache, then resolve every waiter for the key
    fn complete(&self, request: QueuedRequest, outcome: FetchOutcome) {
        let outcome = match outcome {
            Ok(value) => {
                self.shared.cache.put(request.cache_key.clone(), value.clone());
                info!(
                    "RequestBroker: [{}] {} {} in {:?}",
                    request.id,
                    RequestState::Succeeded,
                    request.cache_key,
                    request.enqueued_at.elapsed()
                );
                Ok(value)
            }
            Err(error) if error.allows_stale_fallback() => {
                match self.shared.cache.get_stale(&request.cache_key) {
                    Some(stale) => {
                        self.shared.metrics.stale_served_total.inc();
                        warn!(
                            "RequestBroker: Serving last known value for {} after: {}",
                            request.cache_key, error
                        );
                        Ok(stale)
                    }
                    None => Err(error),
                }
            }
            Err(error) => Err(error),
        };

        let waiters = self
            .shared
            .lock_pending()
            .remove(&request.cache_key)
            .unwrap_or_default();
        self.shared.metrics.queue_depth.dec();

        for waiter in waiters {
            // A caller that dropped its handle has simply lost interest
            let _ = waiter.send(outcome.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockTransport;
    use serde_json::json;

    const URL: &str = "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd";

    fn broker(transport: Arc<MockTransport>) -> RequestBroker {
        RequestBroker::new(
            transport,
            BrokerConfig::default(),
            Metrics::new().expect("metrics"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_writes_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.push_ok(r#"{"ok": true}"#);
        let broker = broker(transport.clone());

        let value = broker.fetch(FetchRequest::new(URL, "markets")).await.unwrap();

        assert_eq!(value, json!({"ok": true}));
        assert_eq!(broker.cache().get("markets"), Some(json!({"ok": true})));
        assert_eq!(broker.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_upstream() {
        let transport = Arc::new(MockTransport::new());
        transport.push_ok("[1]");
        let broker = broker(transport.clone());

        broker.fetch(FetchRequest::new(URL, "k")).await.unwrap();
        let second = broker.fetch(FetchRequest::new(URL, "k")).await.unwrap();

        assert_eq!(second, json!([1]));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(broker.metrics().cache_hits_total.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_once() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_failure("connection refused");
        let broker = broker(transport.clone());

        let result = broker
            .fetch(FetchRequest::new(URL, "k").retries(2))
            .await;

        assert!(matches!(result, Err(MarketDataError::Transport { .. })));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_body_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.push_ok("<html>oops</html>");
        let broker = broker(transport.clone());

        let result = broker.fetch(FetchRequest::new(URL, "k")).await;

        assert!(matches!(
            result,
            Err(MarketDataError::InvalidResponseShape { .. })
        ));
        assert_eq!(transport.call_count(), 1);
        assert!(broker.cache().get_stale("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_uses_full_budget() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_status(503);
        let broker = broker(transport.clone());

        let result = broker.fetch(FetchRequest::new(URL, "k").retries(2)).await;

        assert_eq!(
            result,
            Err(MarketDataError::UpstreamStatus {
                status: 503,
                attempts: 3
            })
        );
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_json_rejects_wrong_shape() {
        #[derive(Debug, serde::Deserialize)]
        struct Chart {
            #[allow(dead_code)]
            prices: Vec<(i64, f64)>,
        }

        let transport = Arc::new(MockTransport::new());
        transport.push_ok(r#"{"unexpected": 1}"#);
        let broker = broker(transport.clone());

        let result = broker
            .fetch_json::<Chart>(FetchRequest::new(URL, "chart"))
            .await;

        assert!(matches!(
            result,
            Err(MarketDataError::InvalidResponseShape { .. })
        ));
        assert!(broker.cache().get_stale("chart").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_ok("{}");
        let broker = broker(transport.clone());

        for i in 0..3 {
            broker
                .fetch(FetchRequest::new(URL, format!("key-{}", i)))
                .await
                .unwrap();
        }

        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }
    }
}
