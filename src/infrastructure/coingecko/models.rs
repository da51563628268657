//! Wire shapes for the CoinGecko v3 REST endpoints.

use crate::domain::market::{MarketListing, PricePoint, PriceSeries};
use serde::Deserialize;

/// One row of `/coins/markets`. Numeric fields are nullable upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarketDto {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

impl From<CoinMarketDto> for MarketListing {
    fn from(dto: CoinMarketDto) -> Self {
        MarketListing {
            id: dto.id,
            symbol: dto.symbol,
            name: dto.name,
            current_price: dto.current_price.unwrap_or_default(),
            price_change_percentage_24h: dto.price_change_percentage_24h.unwrap_or_default(),
            market_cap: dto.market_cap.unwrap_or_default(),
            total_volume: dto.total_volume.unwrap_or_default(),
            market_cap_rank: dto.market_cap_rank,
        }
    }
}

/// `/coins/{id}/market_chart` price series as `[[timestamp_ms, price], ...]`
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartDto {
    pub prices: Vec<(f64, f64)>,
}

impl From<MarketChartDto> for PriceSeries {
    fn from(dto: MarketChartDto) -> Self {
        PriceSeries::new(
            dto.prices
                .into_iter()
                .filter(|(_, price)| price.is_finite())
                .map(|(timestamp, price)| PricePoint {
                    timestamp: timestamp as i64,
                    price,
                })
                .collect(),
        )
    }
}
