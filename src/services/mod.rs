pub mod backtester;
pub mod cache;
pub mod clock;
pub mod market_data;
pub mod optimizer;
pub mod outcomes;
pub mod signals;
pub mod strategy_catalog;
pub mod strategy_engine;

pub use backtester::{BacktestSettings, Backtester};
pub use cache::{generate_key, Cache, CacheStats, CacheSweeper};
pub use clock::{Clock, ManualClock, SystemClock};
pub use market_data::{MarketDataProvider, StaticMarketData, SyntheticMarketData};
pub use optimizer::{Optimizer, OptimizerConfig, OPTIMIZATION_MARKER};
pub use outcomes::{InMemoryOutcomeHistory, OutcomeHistory};
pub use signals::{ConfluenceAggregator, SignalStore, TimeframeAnalyzer, VoteTally};
pub use strategy_engine::{StrategyEngine, StrategyInputs};
