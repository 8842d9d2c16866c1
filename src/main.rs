use confluence::config::Config;
use confluence::services::{InMemoryOutcomeHistory, SignalStore, SystemClock, SyntheticMarketData};
use confluence::types::Timeframe;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confluence=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let symbol = std::env::var("ANALYZE_SYMBOL").unwrap_or_else(|_| "BTCUSD".to_string());
    let timeframe = std::env::var("ANALYZE_TIMEFRAME")
        .ok()
        .and_then(|id| Timeframe::from_str(&id))
        .unwrap_or(Timeframe::FiveMinutes);

    info!(
        "Analyzing {} at {} over {} timeframes",
        symbol,
        timeframe.label(),
        config.analysis.timeframes.len()
    );

    let store = SignalStore::new(
        &config,
        Arc::new(SyntheticMarketData::new()),
        Arc::new(InMemoryOutcomeHistory::new()),
        Arc::new(SystemClock),
    );
    let sweeper = store.start_cache_sweeper();

    let result = store.analyze_or_fallback(&symbol, timeframe);
    println!("{}", serde_json::to_string_pretty(&result)?);

    match store.select_strategy(&symbol, timeframe) {
        Ok(strategy) => println!("{}", serde_json::to_string_pretty(&strategy)?),
        Err(e) => warn!("Strategy selection failed for {}: {}", symbol, e),
    }

    info!("Cache stats: {}", serde_json::to_string(&store.cache_stats())?);
    sweeper.shutdown();
    Ok(())
}
