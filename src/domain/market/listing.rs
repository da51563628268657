use serde::{Deserialize, Serialize};

/// One ranked asset from the upstream markets listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    /// Percent, e.g. `5.2` for +5.2%
    pub price_change_percentage_24h: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    pub market_cap_rank: Option<u32>,
}
