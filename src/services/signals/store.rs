//! Signal store for computing and caching confluence signals.

use crate::config::Config;
use crate::error::Result;
use crate::services::cache::{generate_key, Cache, CacheStats, CacheSweeper, Sweepable};
use crate::services::clock::Clock;
use crate::services::market_data::MarketDataProvider;
use crate::services::optimizer::Optimizer;
use crate::services::outcomes::OutcomeHistory;
use crate::services::signals::indicators::SignalLineMode;
use crate::services::signals::timing::expiry_minutes;
use crate::services::signals::{ConfluenceAggregator, TimeframeAnalyzer};
use crate::services::strategy_engine::{StrategyEngine, StrategyInputs};
use crate::types::{
    ConfluenceDirection, ConfluenceResult, Direction, MarketCondition, OptimizationProfile,
    PrimarySignal, ScoredStrategy, TechnicalScores, Timeframe,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Counters of every cache the store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCacheStats {
    pub confluence: CacheStats,
    pub strategy: CacheStats,
    pub optimization: CacheStats,
    pub last_known_good: CacheStats,
}

/// Store for computing and caching confluence results, strategy
/// selections and optimization profiles.
pub struct SignalStore {
    aggregator: ConfluenceAggregator,
    strategy_engine: StrategyEngine,
    optimizer: Optimizer,
    provider: Arc<dyn MarketDataProvider>,
    outcomes: Arc<dyn OutcomeHistory>,
    clock: Arc<dyn Clock>,
    sample_count: usize,
    signal_line: SignalLineMode,
    /// Key format: "confluence|symbol:{SYMBOL}|timeframe:{id}"
    confluence_cache: Arc<Cache<ConfluenceResult>>,
    strategy_cache: Arc<Cache<ScoredStrategy>>,
    profile_cache: Arc<Cache<OptimizationProfile>>,
    /// Most recent successful result per confluence key. Outlives the
    /// confluence TTL but is still swept.
    last_known_good: Arc<Cache<ConfluenceResult>>,
    sweep_interval: Duration,
}

impl SignalStore {
    /// Create a new signal store.
    pub fn new(
        config: &Config,
        provider: Arc<dyn MarketDataProvider>,
        outcomes: Arc<dyn OutcomeHistory>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let analysis = &config.analysis;
        let analyzer =
            TimeframeAnalyzer::new(provider.clone(), analysis.sample_count, analysis.signal_line);

        Arc::new(Self {
            aggregator: ConfluenceAggregator::new(
                analyzer,
                analysis.timeframes.clone(),
                analysis.primary_sample_count,
                clock.clone(),
            ),
            strategy_engine: StrategyEngine::new(config.backtest),
            optimizer: Optimizer::new(config.optimizer),
            provider,
            outcomes,
            sample_count: analysis.sample_count,
            signal_line: analysis.signal_line,
            confluence_cache: Arc::new(Cache::with_clock(
                config.cache.signal_ttl(),
                clock.clone(),
            )),
            strategy_cache: Arc::new(Cache::with_clock(
                config.cache.strategy_ttl(),
                clock.clone(),
            )),
            profile_cache: Arc::new(Cache::with_clock(
                config.cache.optimization_ttl(),
                clock.clone(),
            )),
            last_known_good: Arc::new(Cache::with_clock(
                config.cache.fallback_ttl(),
                clock.clone(),
            )),
            sweep_interval: config.cache.sweep_interval(),
            clock,
        })
    }

    fn confluence_key(symbol: &str, timeframe: Timeframe) -> String {
        generate_key(
            "confluence",
            [("symbol", symbol.to_uppercase()), ("timeframe", timeframe.to_string())],
        )
    }

    /// Confluence analysis for a symbol, served from cache while fresh.
    pub fn analyze(&self, symbol: &str, timeframe: Timeframe) -> Result<ConfluenceResult> {
        let key = Self::confluence_key(symbol, timeframe);

        if let Some(cached) = self.confluence_cache.get(&key) {
            debug!("Confluence cache hit for {}", key);
            return Ok(cached);
        }

        debug!("Computing confluence for {} at {}", symbol, timeframe);
        let mut result = self.aggregator.analyze(symbol, timeframe)?;
        if let Some(profile) = self.optimization_profile(symbol) {
            result = self.optimizer.apply(&result, &profile, self.clock.now());
        }

        self.remember(key, &result);
        Ok(result)
    }

    /// Refresh the per-timeframe votes, keeping the last primary signal.
    ///
    /// Without a previous result this is a full analysis.
    pub fn realtime_update(&self, symbol: &str, timeframe: Timeframe) -> Result<ConfluenceResult> {
        let key = Self::confluence_key(symbol, timeframe);
        let previous = self
            .confluence_cache
            .get(&key)
            .or_else(|| self.last_known_good.get(&key));

        let Some(previous) = previous else {
            return self.analyze(symbol, timeframe);
        };

        let result = self.aggregator.realtime_update(&previous)?;
        self.remember(key, &result);
        Ok(result)
    }

    /// Like [`SignalStore::analyze`], but provider failures degrade to the
    /// last known good result, or a neutral placeholder.
    pub fn analyze_or_fallback(&self, symbol: &str, timeframe: Timeframe) -> ConfluenceResult {
        match self.analyze(symbol, timeframe) {
            Ok(result) => result,
            Err(e) => {
                let key = Self::confluence_key(symbol, timeframe);
                if let Some(previous) = self.last_known_good.get(&key) {
                    warn!("Analysis of {} failed ({}), serving last known result", key, e);
                    return previous;
                }
                warn!("Analysis of {} failed ({}), serving neutral result", key, e);
                neutral_result(symbol, timeframe, self.clock.now())
            }
        }
    }

    fn remember(&self, key: String, result: &ConfluenceResult) {
        self.last_known_good.set(key.clone(), result.clone());
        self.confluence_cache.set(key, result.clone());
    }

    /// Best-fit strategy for the symbol's current market.
    pub fn select_strategy(&self, symbol: &str, timeframe: Timeframe) -> Result<ScoredStrategy> {
        let key = generate_key(
            "strategy",
            [("symbol", symbol.to_uppercase()), ("timeframe", timeframe.to_string())],
        );

        if let Some(cached) = self.strategy_cache.get(&key) {
            debug!("Strategy cache hit for {}", key);
            return Ok(cached);
        }

        let series = self.provider.series(symbol, timeframe, self.sample_count)?;
        let inputs = StrategyInputs::from_series(&series, self.signal_line);
        let selected = self.strategy_engine.select(&inputs);

        self.strategy_cache.set(key, selected.clone());
        Ok(selected)
    }

    /// Profile learned from the symbol's outcome history. "No
    /// recommendation" is not cached, so it is retried on every call.
    pub fn optimization_profile(&self, symbol: &str) -> Option<OptimizationProfile> {
        let key = generate_key("optimization", [("symbol", symbol.to_uppercase())]);

        if let Some(cached) = self.profile_cache.get(&key) {
            return Some(cached);
        }

        let records = self.outcomes.outcomes(symbol);
        let profile = self.optimizer.optimize(symbol, &records, self.clock.now())?;
        self.profile_cache.set(key, profile.clone());
        Some(profile)
    }

    /// Start the background sweep over every cache the store owns.
    pub fn start_cache_sweeper(&self) -> CacheSweeper {
        let caches: Vec<Arc<dyn Sweepable>> = vec![
            self.confluence_cache.clone(),
            self.strategy_cache.clone(),
            self.profile_cache.clone(),
            self.last_known_good.clone(),
        ];
        info!("Signal store caches registered for sweeping");
        CacheSweeper::start(caches, self.sweep_interval)
    }

    /// Purge expired entries now. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.confluence_cache.cleanup()
            + self.strategy_cache.cleanup()
            + self.profile_cache.cleanup()
            + self.last_known_good.cleanup()
    }

    pub fn cache_stats(&self) -> SignalCacheStats {
        SignalCacheStats {
            confluence: self.confluence_cache.stats(),
            strategy: self.strategy_cache.stats(),
            optimization: self.profile_cache.stats(),
            last_known_good: self.last_known_good.stats(),
        }
    }

    /// Drop every cached value, including last known good results.
    pub fn clear(&self) {
        self.confluence_cache.clear();
        self.strategy_cache.clear();
        self.profile_cache.clear();
        self.last_known_good.clear();
    }
}

/// Placeholder served when no data has ever been available.
pub fn neutral_result(symbol: &str, timeframe: Timeframe, now: DateTime<Utc>) -> ConfluenceResult {
    let symbol = symbol.to_uppercase();
    let minutes = expiry_minutes(timeframe);

    ConfluenceResult {
        symbol: symbol.clone(),
        timeframe,
        primary_signal: PrimarySignal {
            id: Uuid::new_v4(),
            symbol,
            timeframe,
            direction: Direction::Call,
            confidence: 60.0,
            current_price: 0.0,
            entry_time: now,
            expiry_time: now + ChronoDuration::minutes(i64::from(minutes)),
            expiry_minutes: minutes,
            countdown_seconds: 0,
            support: 0.0,
            resistance: 0.0,
            volatility: 0.0,
            trend_strength: 0.0,
            market_condition: MarketCondition::Unknown,
            technical_scores: TechnicalScores::default(),
            indicators: Vec::new(),
            generated_at: now,
        },
        timeframes: Vec::new(),
        overall_confluence: 0,
        confluence_direction: ConfluenceDirection::Neutral,
        countdown_seconds: 0,
        generated_at: now,
    }
}
