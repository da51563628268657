//! Push-based observability for coinpulse
//!
//! Counters are kept in a per-broker Prometheus registry and pushed out as
//! structured log lines by the CLI. Nothing listens for incoming requests.

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
