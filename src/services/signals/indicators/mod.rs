//! Technical indicator implementations.

pub mod bollinger;
pub mod condition;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod trend;
pub mod volatility;

pub use bollinger::{bollinger_bands, BollingerBands};
pub use condition::{classify, market_condition, ConditionInputs, MIN_CONDITION_SAMPLES};
pub use ema::{ema, ema_series, Ema};
pub use levels::{fibonacci_levels, ichimoku, support_resistance, FIBONACCI_RATIOS};
pub use macd::{macd, Macd, SignalLineMode, MACD_SIGNAL_RATIO};
pub use rsi::{rsi, Rsi, NEUTRAL_RSI};
pub use sma::{sma, Sma};
pub use trend::trend_strength;
pub use volatility::{volatility, Volatility};

use super::{mean, tail, Indicator};
use crate::types::{IndicatorSet, MarketSeries};

/// Every standard reading for a series, using default periods.
pub fn indicator_set(series: &MarketSeries, mode: SignalLineMode) -> IndicatorSet {
    let prices = &series.prices;
    IndicatorSet {
        price: series.last_price().unwrap_or(0.0),
        rsi: rsi(prices, 14),
        macd: Macd::default().with_mode(mode).calculate(prices),
        bollinger: BollingerBands::default().calculate(prices),
        volatility: volatility(prices, 14),
        trend_strength: trend_strength(prices, &series.volumes),
        market_condition: market_condition(prices, &series.volumes),
    }
}

/// Average of the trailing `n` volumes relative to the whole-series average.
pub fn relative_volume(volumes: &[f64], n: usize) -> f64 {
    let baseline = mean(volumes);
    if baseline <= f64::EPSILON {
        return 1.0;
    }
    mean(tail(volumes, n)) / baseline
}
