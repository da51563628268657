// Market data domain
pub mod coins;
pub mod listing;
pub mod price_series;

pub use coins::{CoinInfo, MEME_COIN_IDS, POPULAR_COINS, find_popular_coin};
pub use listing::MarketListing;
pub use price_series::{PricePoint, PriceSeries};
