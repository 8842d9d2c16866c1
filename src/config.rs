use crate::services::backtester::BacktestSettings;
use crate::services::optimizer::OptimizerConfig;
use crate::services::signals::indicators::SignalLineMode;
use crate::types::Timeframe;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Timeframes the confluence vote runs over unless configured otherwise.
pub const DEFAULT_TIMEFRAMES: [Timeframe; 5] = [
    Timeframe::OneMinute,
    Timeframe::FiveMinutes,
    Timeframe::FifteenMinutes,
    Timeframe::ThirtyMinutes,
    Timeframe::OneHour,
];

/// Cache lifetimes and sweeping.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Seconds between background sweeps of expired entries.
    pub sweep_interval_secs: u64,
    /// Confluence results (default: 90 seconds).
    pub signal_ttl_secs: u64,
    /// Strategy selections (default: 2 minutes).
    pub strategy_ttl_secs: u64,
    /// Optimization profiles (default: 24 hours).
    pub optimization_ttl_secs: u64,
    /// Last known good results served on provider failure (default: 1 hour).
    pub fallback_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            signal_ttl_secs: 90,
            strategy_ttl_secs: 120,
            optimization_ttl_secs: 24 * 60 * 60,
            fallback_ttl_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn signal_ttl(&self) -> Duration {
        Duration::from_secs(self.signal_ttl_secs)
    }

    pub fn strategy_ttl(&self) -> Duration {
        Duration::from_secs(self.strategy_ttl_secs)
    }

    pub fn optimization_ttl(&self) -> Duration {
        Duration::from_secs(self.optimization_ttl_secs)
    }

    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }
}

/// Analysis pipeline settings.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Samples fetched per timeframe for the vote.
    pub sample_count: usize,
    /// Samples fetched for the primary signal.
    pub primary_sample_count: usize,
    /// Timeframe registry, in display order.
    pub timeframes: Vec<Timeframe>,
    pub signal_line: SignalLineMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_count: 200,
            primary_sample_count: 200,
            timeframes: DEFAULT_TIMEFRAMES.to_vec(),
            signal_line: SignalLineMode::Approximate,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub cache: CacheConfig,
    pub analysis: AnalysisConfig,
    pub optimizer: OptimizerConfig,
    pub backtest: BacktestSettings,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated timeframe list ("1,5,15"), skipping unknown ids
/// and duplicates. An empty result falls back to [`DEFAULT_TIMEFRAMES`].
pub fn parse_timeframes(list: &str) -> Vec<Timeframe> {
    let mut timeframes: Vec<Timeframe> = Vec::new();
    for timeframe in list.split(',').filter_map(Timeframe::from_str) {
        if !timeframes.contains(&timeframe) {
            timeframes.push(timeframe);
        }
    }
    if timeframes.is_empty() {
        DEFAULT_TIMEFRAMES.to_vec()
    } else {
        timeframes
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache = CacheConfig {
            sweep_interval_secs: env_or(
                "CACHE_SWEEP_INTERVAL_SECS",
                defaults.cache.sweep_interval_secs,
            ),
            signal_ttl_secs: env_or("SIGNAL_CACHE_TTL_SECS", defaults.cache.signal_ttl_secs),
            strategy_ttl_secs: env_or("STRATEGY_CACHE_TTL_SECS", defaults.cache.strategy_ttl_secs),
            optimization_ttl_secs: env_or(
                "OPTIMIZATION_CACHE_TTL_SECS",
                defaults.cache.optimization_ttl_secs,
            ),
            fallback_ttl_secs: env_or("FALLBACK_TTL_SECS", defaults.cache.fallback_ttl_secs),
        };

        let analysis = AnalysisConfig {
            sample_count: env_or("ANALYSIS_SAMPLE_COUNT", defaults.analysis.sample_count),
            primary_sample_count: env_or(
                "PRIMARY_SAMPLE_COUNT",
                defaults.analysis.primary_sample_count,
            ),
            timeframes: env::var("CONFLUENCE_TIMEFRAMES")
                .ok()
                .map(|list| parse_timeframes(&list))
                .unwrap_or(defaults.analysis.timeframes),
            signal_line: env::var("MACD_SIGNAL_MODE")
                .ok()
                .and_then(|mode| SignalLineMode::from_str(&mode))
                .unwrap_or(defaults.analysis.signal_line),
        };

        let optimizer = OptimizerConfig {
            min_sample_size: env_or("OPTIMIZER_MIN_SAMPLES", defaults.optimizer.min_sample_size),
            min_timeframe_samples: env_or(
                "OPTIMIZER_MIN_TIMEFRAME_SAMPLES",
                defaults.optimizer.min_timeframe_samples,
            ),
            volatility_threshold: env_or(
                "OPTIMIZER_VOLATILITY_THRESHOLD",
                defaults.optimizer.volatility_threshold,
            ),
        };

        let backtest = BacktestSettings {
            horizon: env_or("BACKTEST_HORIZON", defaults.backtest.horizon),
            stride: env_or("BACKTEST_STRIDE", defaults.backtest.stride).max(1),
            start_index: env_or("BACKTEST_START_INDEX", defaults.backtest.start_index),
            ..defaults.backtest
        };

        Self {
            cache,
            analysis,
            optimizer,
            backtest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.signal_ttl(), Duration::from_secs(90));
        assert_eq!(config.cache.optimization_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.cache.fallback_ttl(), Duration::from_secs(3_600));
        assert_eq!(config.analysis.sample_count, 200);
        assert_eq!(config.analysis.timeframes, DEFAULT_TIMEFRAMES.to_vec());
        assert_eq!(config.optimizer.min_sample_size, 10);
        assert_eq!(config.backtest.horizon, 10);
    }

    #[test]
    fn test_parse_timeframes() {
        assert_eq!(
            parse_timeframes("60, 5,bogus,5,D"),
            vec![Timeframe::OneHour, Timeframe::FiveMinutes, Timeframe::Daily]
        );
        assert_eq!(parse_timeframes(""), DEFAULT_TIMEFRAMES.to_vec());
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let cache = CacheConfig {
            sweep_interval_secs: 0,
            ..CacheConfig::default()
        };
        assert_eq!(cache.sweep_interval(), Duration::from_secs(1));
    }
}
