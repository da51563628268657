pub mod coingecko;
pub mod core;
pub mod mock;
pub mod observability;

pub use coingecko::CoinGeckoMarketDataService;
pub use mock::MockTransport;
