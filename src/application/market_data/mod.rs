// Upstream response caching
pub mod response_cache;

pub use response_cache::{CACHE_TTL, ResponseCache};
