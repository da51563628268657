// Rate-limited, single-flight access to the upstream data provider
pub mod backoff;
pub mod quota;
pub mod request_broker;

pub use backoff::{BackoffPolicy, FailureClass};
pub use quota::{QuotaConfig, UpstreamQuotaState};
pub use request_broker::{BrokerConfig, FetchRequest, RequestBroker, RequestState};
