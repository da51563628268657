use coinpulse::application::analysis::{AnalysisEngine, AnalysisService, AnalysisServiceConfig};
use coinpulse::application::broker::{BrokerConfig, RequestBroker};
use coinpulse::application::meme_coins::MemeCoinBoard;
use coinpulse::domain::analysis::{Signal, Trend};
use coinpulse::domain::ports::MarketDataProvider;
use coinpulse::infrastructure::coingecko::CoinGeckoMarketDataService;
use coinpulse::infrastructure::mock::MockTransport;
use coinpulse::infrastructure::observability::Metrics;
use serde_json::{Value, json};
use std::sync::Arc;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const DAY_MS: i64 = 86_400_000;

fn market_row(id: &str, symbol: &str, name: &str, price: f64, change: f64, rank: u32) -> Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": name,
        "current_price": price,
        "price_change_percentage_24h": change,
        "market_cap": 1.0e9,
        "total_volume": 5.0e7,
        "market_cap_rank": rank,
    })
}

/// Zig-zag series: alternating `up` and `down` moves from `start`
fn chart(start: f64, up: f64, down: f64, points: usize) -> String {
    let mut price = start;
    let prices: Vec<Value> = (0..points)
        .map(|i| {
            if i > 0 {
                price += if i % 2 == 1 { up } else { down };
            }
            json!([i as i64 * DAY_MS, price])
        })
        .collect();
    json!({ "prices": prices }).to_string()
}

struct Fixture {
    transport: Arc<MockTransport>,
    provider: Arc<dyn MarketDataProvider>,
    metrics: Metrics,
}

fn fixture() -> Fixture {
    let transport = Arc::new(MockTransport::new());
    let metrics = Metrics::new().unwrap();
    let broker = Arc::new(RequestBroker::new(
        transport.clone(),
        BrokerConfig::default(),
        metrics.clone(),
    ));
    let provider: Arc<dyn MarketDataProvider> = Arc::new(
        CoinGeckoMarketDataService::builder()
            .broker(broker)
            .base_url(BASE_URL.to_string())
            .build()
            .unwrap(),
    );
    Fixture {
        transport,
        provider,
        metrics,
    }
}

fn route_market_data(transport: &MockTransport) {
    let listing = json!([
        market_row("bitcoin", "btc", "Bitcoin", 200.0, 2.0, 1),
        market_row("ethereum", "eth", "Ethereum", 1000.0, -6.0, 2),
        market_row("pepe", "pepe", "Pepe", 0.000018, 5.67, 18),
    ]);
    transport.route_ok("coins/markets", listing.to_string());
    // Net drift +0.5/day, RSI 66.7
    transport.route_ok("coins/bitcoin/market_chart", chart(100.0, 2.0, -1.0, 60));
    // Net drift -0.5/day, RSI 33.3
    transport.route_ok("coins/ethereum/market_chart", chart(3000.0, -2.0, 1.0, 60));
    // Too short to analyze
    transport.route_ok("coins/pepe/market_chart", chart(0.00001, 0.000001, 0.0, 5));
}

fn service(fixture: &Fixture) -> AnalysisService {
    AnalysisService::new(
        fixture.provider.clone(),
        AnalysisEngine::default(),
        AnalysisServiceConfig::default(),
    )
    .with_metrics(fixture.metrics.clone())
}

#[tokio::test(start_paused = true)]
async fn test_pass_analyzes_and_skips_short_history() {
    let fixture = fixture();
    route_market_data(&fixture.transport);
    let service = service(&fixture);

    let results = service.run_pass().await.unwrap();

    assert_eq!(results.len(), 2);
    let bitcoin = &results[0];
    assert_eq!(bitcoin.coin_id, "bitcoin");
    assert_eq!(bitcoin.signal, Signal::Long);
    assert_eq!(bitcoin.signal_reason, "strong uptrend momentum");
    assert_eq!(bitcoin.trend, Trend::Up);
    assert!(bitcoin.sma20 > bitcoin.sma50);

    let ethereum = &results[1];
    assert_eq!(ethereum.signal, Signal::Short);
    assert_eq!(ethereum.signal_reason, "strong downtrend");
    assert_eq!(ethereum.trend, Trend::StrongDown);

    assert_eq!(fixture.metrics.skipped_assets_total.get(), 1);
    assert_eq!(fixture.transport.calls_matching("coins/markets"), 1);
    assert_eq!(fixture.transport.calls_matching("market_chart"), 3);
    assert!(
        fixture
            .transport
            .called_urls()
            .iter()
            .any(|url| url.contains("days=30") && url.contains("interval=daily"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_pass_served_from_cache_until_refresh() {
    let fixture = fixture();
    route_market_data(&fixture.transport);
    let service = service(&fixture);

    service.run_pass().await.unwrap();
    let upstream_calls = fixture.transport.call_count();

    let cached = service.run_pass().await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(fixture.transport.call_count(), upstream_calls);

    let refreshed = service.refresh().await.unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(fixture.transport.call_count(), upstream_calls * 2);
}

#[tokio::test(start_paused = true)]
async fn test_analyze_single_coin() {
    let fixture = fixture();
    route_market_data(&fixture.transport);
    let service = service(&fixture);

    let result = service.analyze_coin("ethereum").await.unwrap().unwrap();

    assert_eq!(result.name, "Ethereum");
    assert_eq!(result.signal, Signal::Short);
    assert!(fixture.transport.calls_matching("ids=ethereum") >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_listing_failure_fails_the_pass() {
    let fixture = fixture();
    fixture.transport.set_default_status(500);
    let service = service(&fixture);

    assert!(service.run_pass().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_meme_board_live_data() {
    let fixture = fixture();
    let rows = json!([
        market_row("dogecoin", "doge", "Dogecoin", 0.16, 1.2, 9),
        market_row("pepe", "pepe", "Pepe", 0.000017, -3.0, 20),
    ]);
    fixture.transport.route_ok("ids=dogecoin", rows.to_string());

    let snapshot = MemeCoinBoard::new(fixture.provider.clone()).load().await;

    assert!(!snapshot.using_fallback);
    assert_eq!(snapshot.coins.len(), 2);
    assert_eq!(snapshot.coins[0].current_price, 0.16);
}

#[tokio::test(start_paused = true)]
async fn test_meme_board_falls_back_when_upstream_fails() {
    let fixture = fixture();
    fixture.transport.set_default_status(503);

    let snapshot = MemeCoinBoard::new(fixture.provider.clone()).load().await;

    assert!(snapshot.using_fallback);
    assert_eq!(snapshot.coins.len(), 6);
    assert_eq!(snapshot.coins[5].name, "dogwifhat");
    // Initial attempt plus the default two retries
    assert_eq!(fixture.transport.call_count(), 3);
}
