use crate::domain::market::{MEME_COIN_IDS, MarketListing};
use crate::domain::ports::MarketDataProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Meme coin listings plus whether they came from the built-in snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemeCoinSnapshot {
    pub coins: Vec<MarketListing>,
    pub using_fallback: bool,
}

pub struct MemeCoinBoard {
    provider: Arc<dyn MarketDataProvider>,
}

impl MemeCoinBoard {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Never fails: any upstream error yields the fallback snapshot.
    pub async fn load(&self) -> MemeCoinSnapshot {
        let ids: Vec<String> = MEME_COIN_IDS.iter().map(|id| id.to_string()).collect();

        match self.provider.markets_by_ids(&ids).await {
            Ok(coins) => {
                info!("MemeCoinBoard: Loaded {} meme coins", coins.len());
                MemeCoinSnapshot {
                    coins,
                    using_fallback: false,
                }
            }
            Err(e) => {
                warn!("MemeCoinBoard: Market fetch failed, using fallback data: {}", e);
                MemeCoinSnapshot {
                    coins: fallback_meme_coins(),
                    using_fallback: true,
                }
            }
        }
    }
}

fn fallback_coin(
    id: &str,
    name: &str,
    symbol: &str,
    price: f64,
    change: f64,
    market_cap: f64,
    rank: u32,
) -> MarketListing {
    MarketListing {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        current_price: price,
        price_change_percentage_24h: change,
        market_cap,
        total_volume: 0.0,
        market_cap_rank: Some(rank),
    }
}

/// Last known-good snapshot, shown while upstream is unavailable
pub fn fallback_meme_coins() -> Vec<MarketListing> {
    vec![
        fallback_coin("dogecoin", "Dogecoin", "doge", 0.17, -0.16, 25_481_819_178.0, 9),
        fallback_coin("shiba-inu", "Shiba Inu", "shib", 0.000023, 2.45, 13.5e9, 12),
        fallback_coin("pepe", "Pepe", "pepe", 0.000018, 5.67, 7.5e9, 18),
        fallback_coin("floki", "FLOKI", "floki", 0.00015, -1.23, 1.4e9, 56),
        fallback_coin("bonk", "Bonk", "bonk", 0.000034, 3.89, 2.3e9, 42),
        fallback_coin("dogwifcoin", "dogwifhat", "wif", 2.45, -2.1, 2.4e9, 41),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_snapshot_contents() {
        let coins = fallback_meme_coins();
        assert_eq!(coins.len(), 6);
        assert_eq!(coins[0].id, "dogecoin");
        assert_eq!(coins[0].market_cap_rank, Some(9));
        assert!(coins.iter().all(|c| MEME_COIN_IDS.contains(&c.id.as_str())));
    }
}
