/// Static coin metadata used to validate user coin selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

#[rustfmt::skip]
pub const POPULAR_COINS: &[CoinInfo] = &[
    CoinInfo { id: "bitcoin", name: "Bitcoin", symbol: "BTC" },
    CoinInfo { id: "ethereum", name: "Ethereum", symbol: "ETH" },
    CoinInfo { id: "binancecoin", name: "BNB", symbol: "BNB" },
    CoinInfo { id: "solana", name: "Solana", symbol: "SOL" },
    CoinInfo { id: "ripple", name: "XRP", symbol: "XRP" },
    CoinInfo { id: "cardano", name: "Cardano", symbol: "ADA" },
    CoinInfo { id: "avalanche-2", name: "Avalanche", symbol: "AVAX" },
    CoinInfo { id: "polygon", name: "Polygon", symbol: "MATIC" },
    CoinInfo { id: "chainlink", name: "Chainlink", symbol: "LINK" },
    CoinInfo { id: "uniswap", name: "Uniswap", symbol: "UNI" },
];

/// Upstream ids tracked by the meme coin board
pub const MEME_COIN_IDS: &[&str] = &[
    "dogecoin",
    "shiba-inu",
    "pepe",
    "floki",
    "bonk",
    "dogwifcoin",
    "memecoin-2",
    "baby-doge-coin",
    "dogelon-mars",
    "samoyedcoin",
];

/// Look up a popular coin by upstream id or ticker symbol (case-insensitive)
pub fn find_popular_coin(query: &str) -> Option<&'static CoinInfo> {
    POPULAR_COINS
        .iter()
        .find(|c| c.id.eq_ignore_ascii_case(query) || c.symbol.eq_ignore_ascii_case(query))
}
