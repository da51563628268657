//! coinpulse - crypto market analysis over a rate-limited public API
//!
//! # Usage
//! ```sh
//! coinpulse watch                  # analysis pass every ANALYSIS_REFRESH_INTERVAL_SECS
//! coinpulse analyze --coin btc     # one coin, by id or symbol
//! coinpulse memes                  # meme coin board
//! coinpulse coins                  # popular coin shortcuts
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinpulse::application::analysis::{AnalysisEngine, AnalysisService};
use coinpulse::application::broker::RequestBroker;
use coinpulse::application::meme_coins::MemeCoinBoard;
use coinpulse::config::Config;
use coinpulse::domain::market::{POPULAR_COINS, find_popular_coin};
use coinpulse::domain::ports::MarketDataProvider;
use coinpulse::infrastructure::coingecko::CoinGeckoMarketDataService;
use coinpulse::infrastructure::core::ReqwestTransport;
use coinpulse::infrastructure::observability::Metrics;
use coinpulse::interfaces::report;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Crypto market signals from CoinGecko", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the top listings, repeating until Ctrl+C
    Watch {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
        /// Drop cached responses before every pass
        #[arg(long)]
        force: bool,
    },
    /// Analyze a single coin
    Analyze {
        /// CoinGecko id (e.g. "bitcoin") or ticker symbol (e.g. "btc")
        #[arg(short, long)]
        coin: String,
    },
    /// Show the meme coin board
    Memes,
    /// List popular coin shortcuts accepted by `analyze`
    Coins,
}

struct Services {
    analysis: AnalysisService,
    memes: MemeCoinBoard,
    metrics: Metrics,
}

fn build_services(config: &Config) -> Result<Services> {
    let metrics = Metrics::new().context("Failed to register metrics")?;
    let transport = Arc::new(ReqwestTransport::new(config.broker.http_timeout));
    let broker = Arc::new(RequestBroker::new(
        transport,
        config.broker.to_broker_config(),
        metrics.clone(),
    ));

    let provider: Arc<dyn MarketDataProvider> = Arc::new(
        CoinGeckoMarketDataService::builder()
            .broker(broker)
            .base_url(config.broker.base_url.clone())
            .vs_currency(config.broker.vs_currency.clone())
            .retry_budget(config.broker.max_retries)
            .primary_delay(config.broker.primary_retry_delay)
            .secondary_delay(config.broker.secondary_retry_delay)
            .build()?,
    );

    let analysis = AnalysisService::new(
        provider.clone(),
        AnalysisEngine::new(config.analysis.to_engine_config()),
        config.analysis.to_service_config(),
    )
    .with_metrics(metrics.clone());

    Ok(Services {
        analysis,
        memes: MemeCoinBoard::new(provider),
        metrics,
    })
}

fn log_metrics(metrics: &Metrics) {
    match serde_json::to_string(&metrics.snapshot()) {
        Ok(json) => info!("Metrics: {}", json),
        Err(e) => error!("Failed to serialize metrics: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "coinpulse {} starting (upstream: {})",
        env!("CARGO_PKG_VERSION"),
        config.broker.base_url
    );

    match cli.command {
        Commands::Coins => {
            print!("{}", report::render_coin_list(POPULAR_COINS));
        }
        Commands::Memes => {
            let services = build_services(&config)?;
            let snapshot = services.memes.load().await;
            print!("{}", report::render_meme_coins(&snapshot));
            log_metrics(&services.metrics);
        }
        Commands::Analyze { coin } => {
            let services = build_services(&config)?;
            let coin_id = find_popular_coin(&coin)
                .map(|info| info.id.to_string())
                .unwrap_or_else(|| coin.to_lowercase());

            match services.analysis.analyze_coin(&coin_id).await? {
                Some(result) => print!("{}", report::render_analysis(&[result])),
                None => println!("No analysis available for {}", coin_id),
            }
            log_metrics(&services.metrics);
        }
        Commands::Watch { once, force } => {
            let services = build_services(&config)?;
            let interval = config.analysis.refresh_interval;

            loop {
                let pass = if force {
                    services.analysis.refresh().await
                } else {
                    services.analysis.run_pass().await
                };
                match pass {
                    Ok(results) => print!("{}", report::render_analysis(&results)),
                    Err(e) => error!("Analysis pass failed: {}", e),
                }
                log_metrics(&services.metrics);

                if once {
                    break;
                }

                info!("Next pass in {}s. Press Ctrl+C to stop.", interval.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for Ctrl+C")?;
                        info!("Shutdown signal received. Exiting...");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
