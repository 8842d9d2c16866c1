//! Strategy Engine
//!
//! Picks the best-fit catalog strategy for the current market.
//!
//! Score = 50 + the technical alignment term of the strategy's key + the
//! backtest bonus of its entry rule over the same series. Only strategies
//! suited to the market condition compete; the first one in catalog order
//! wins ties.

use crate::services::backtester::{BacktestSettings, Backtester};
use crate::services::signals::indicators::{
    fibonacci_levels, ichimoku, indicator_set, support_resistance,
    trend::{move_consistency, volume_confirmation},
    SignalLineMode,
};
use crate::services::signals::relative_distance;
use crate::services::strategy_catalog::compatible;
use crate::types::{
    BollingerReading, MacdReading, MarketCondition, MarketSeries, ScoredStrategy,
    StrategyAlternative, StrategyKey,
};
use tracing::debug;

pub const BASE_STRATEGY_SCORE: f64 = 50.0;

/// What the alignment terms and the backtester look at.
#[derive(Debug, Clone)]
pub struct StrategyInputs {
    pub market_condition: MarketCondition,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    pub rsi: f64,
    pub macd: MacdReading,
    pub bollinger: BollingerReading,
    pub volatility: f64,
}

impl StrategyInputs {
    pub fn from_series(series: &MarketSeries, mode: SignalLineMode) -> Self {
        let readings = indicator_set(series, mode);
        Self {
            market_condition: readings.market_condition,
            prices: series.prices.clone(),
            volumes: series.volumes.clone(),
            rsi: readings.rsi,
            macd: readings.macd,
            bollinger: readings.bollinger,
            volatility: readings.volatility,
        }
    }

    fn price(&self) -> f64 {
        self.prices.last().copied().unwrap_or(0.0)
    }
}

/// RSI far from 50.
fn rsi_extremity(inputs: &StrategyInputs) -> f64 {
    let extremity = (inputs.rsi - 50.0).abs();
    if extremity > 20.0 {
        (extremity - 10.0).min(25.0)
    } else {
        0.0
    }
}

/// Histogram size relative to price, plus momentum when line and histogram agree.
fn macd_momentum(inputs: &StrategyInputs) -> f64 {
    let price = inputs.price();
    if price <= f64::EPSILON {
        return 0.0;
    }
    let magnitude = (inputs.macd.histogram.abs() / price * 10_000.0).min(15.0);
    let momentum = if inputs.macd.line * inputs.macd.histogram > 0.0 {
        5.0
    } else {
        0.0
    };
    magnitude + momentum
}

/// Band width plus price pressing on a band.
fn bollinger_setup(inputs: &StrategyInputs) -> f64 {
    let bands = &inputs.bollinger;
    if bands.is_degenerate() {
        return 0.0;
    }
    let width = (bands.width_ratio() * 200.0).min(15.0);
    let position = (inputs.price() - bands.lower) / (bands.upper - bands.lower);
    let proximity = if !(0.1..=0.9).contains(&position) {
        10.0
    } else {
        0.0
    };
    width + proximity
}

/// Near a level, bouncing off it, and the level tested more than once.
fn level_reaction(inputs: &StrategyInputs) -> f64 {
    let price = inputs.price();
    let levels = support_resistance(&inputs.prices, 50);
    let previous = inputs
        .prices
        .len()
        .checked_sub(2)
        .map(|i| inputs.prices[i])
        .unwrap_or(price);

    let near_support = relative_distance(price, levels.support) <= 0.01;
    let near_resistance = relative_distance(price, levels.resistance) <= 0.01;

    let mut score = 0.0;
    if near_support || near_resistance {
        score += 10.0;
    }
    if (near_support && price > previous) || (near_resistance && price < previous) {
        score += 5.0;
    }
    if (near_support && levels.support_touches >= 2)
        || (near_resistance && levels.resistance_touches >= 2)
    {
        score += 5.0;
    }
    score
}

/// Directional consistency plus volume confirmation.
fn trend_confirmation(inputs: &StrategyInputs) -> f64 {
    move_consistency(&inputs.prices) * 20.0 + volume_confirmation(&inputs.volumes)
}

/// Price sitting on a retracement level.
fn fibonacci_proximity(inputs: &StrategyInputs) -> f64 {
    match fibonacci_levels(&inputs.prices, 50).nearest_distance(inputs.price()) {
        Some(d) if d <= 0.005 => 15.0,
        Some(d) if d <= 0.01 => 8.0,
        _ => 0.0,
    }
}

/// Fresh Tenkan/Kijun cross, lines close together, price on the cross side.
fn ichimoku_setup(inputs: &StrategyInputs) -> f64 {
    let reading = ichimoku(&inputs.prices);
    let price = inputs.price();

    let mut score = 0.0;
    if reading.bullish_cross() || reading.bearish_cross() {
        score += 15.0;
    }
    if relative_distance(reading.tenkan, reading.kijun) < 0.005 {
        score += 5.0;
    }
    let confirmed = (reading.tenkan > reading.kijun && price > reading.kijun)
        || (reading.tenkan < reading.kijun && price < reading.kijun);
    if confirmed {
        score += 5.0;
    }
    score
}

/// The strategy-specific technical term. Exactly one fires per key.
pub fn alignment_score(key: StrategyKey, inputs: &StrategyInputs) -> f64 {
    match key {
        StrategyKey::RsiDivergence => rsi_extremity(inputs),
        StrategyKey::MacdCrossover => macd_momentum(inputs),
        StrategyKey::BollingerBreakout => bollinger_setup(inputs),
        StrategyKey::SupportResistance => level_reaction(inputs),
        StrategyKey::TrendFollowing => trend_confirmation(inputs),
        StrategyKey::FibonacciRetracement => fibonacci_proximity(inputs),
        StrategyKey::IchimokuCloud => ichimoku_setup(inputs),
        StrategyKey::MomentumScalping | StrategyKey::RangeTrading => 0.0,
    }
}

/// Scores compatible strategies and selects a winner.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyEngine {
    backtester: Backtester,
}

impl StrategyEngine {
    pub fn new(settings: BacktestSettings) -> Self {
        Self {
            backtester: Backtester::new(settings),
        }
    }

    /// Select the best strategy for `inputs`.
    pub fn select(&self, inputs: &StrategyInputs) -> ScoredStrategy {
        let mut scored: Vec<ScoredStrategy> = compatible(inputs.market_condition)
            .into_iter()
            .map(|descriptor| {
                let technical_score = alignment_score(descriptor.key, inputs);
                let historical_performance = self.backtester.run(descriptor.key, &inputs.prices);
                ScoredStrategy {
                    descriptor: descriptor.clone(),
                    score: BASE_STRATEGY_SCORE + technical_score + historical_performance.bonus,
                    technical_score,
                    historical_performance,
                    market_condition: inputs.market_condition,
                    alternatives: Vec::new(),
                }
            })
            .collect();

        // First strictly greater score wins; earlier entries keep ties.
        let mut best = 0;
        for (i, candidate) in scored.iter().enumerate() {
            if candidate.score > scored[best].score {
                best = i;
            }
        }
        let mut winner = scored.remove(best);

        let mut alternatives: Vec<StrategyAlternative> = scored
            .iter()
            .map(|s| StrategyAlternative {
                key: s.descriptor.key,
                name: s.descriptor.name,
                score: s.score,
            })
            .collect();
        // Stable: equal scores stay in catalog order.
        alternatives.sort_by(|a, b| b.score.total_cmp(&a.score));
        winner.alternatives = alternatives;

        debug!(
            "Selected {} ({:.1}) for {:?} out of {} candidates",
            winner.descriptor.key.id(),
            winner.score,
            inputs.market_condition,
            winner.alternatives.len() + 1
        );
        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategy_catalog::CATALOG;

    fn catalog_position(key: StrategyKey) -> usize {
        CATALOG.iter().position(|d| d.key == key).unwrap()
    }

    fn inputs(prices: Vec<f64>) -> StrategyInputs {
        let volumes = vec![1_000.0; prices.len()];
        let series = MarketSeries::new(prices, volumes).unwrap();
        StrategyInputs::from_series(&series, SignalLineMode::Approximate)
    }

    #[test]
    fn test_inputs_share_indicator_readings() {
        let prices: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 / 5.0).sin() * 2.0).collect();
        let series = MarketSeries::new(prices, vec![1_000.0; 120]).unwrap();
        let readings = indicator_set(&series, SignalLineMode::Ema);
        let inputs = StrategyInputs::from_series(&series, SignalLineMode::Ema);

        assert_eq!(inputs.rsi, readings.rsi);
        assert_eq!(inputs.macd, readings.macd);
        assert_eq!(inputs.bollinger, readings.bollinger);
        assert_eq!(inputs.volatility, readings.volatility);
        assert_eq!(inputs.market_condition, readings.market_condition);
        assert_eq!(inputs.prices, series.prices);
    }

    #[test]
    fn test_flat_series_selects_sideways_strategy() {
        let inputs = inputs(vec![100.0; 200]);
        assert_eq!(inputs.market_condition, MarketCondition::Sideways);
        let selected = StrategyEngine::default().select(&inputs);
        assert!(selected.descriptor.suits(MarketCondition::Sideways));
        assert_eq!(selected.alternatives.len(), 3);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let prices: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 / 7.0).sin() * 3.0 + i as f64 * 0.05)
            .collect();
        let inputs = inputs(prices);
        let engine = StrategyEngine::default();
        let a = engine.select(&inputs);
        let b = engine.select(&inputs);
        assert_eq!(a, b);
    }

    #[test]
    fn test_alternatives_sorted_descending() {
        let prices: Vec<f64> = (0..200).map(|i| 100.0 * 1.002f64.powi(i)).collect();
        let selected = StrategyEngine::default().select(&inputs(prices));
        for pair in selected.alternatives.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for alt in &selected.alternatives {
            assert!(alt.score <= selected.score);
        }
    }

    #[test]
    fn test_unscored_keys_contribute_nothing() {
        let inputs = inputs((0..200).map(|i| 100.0 + (i % 9) as f64).collect());
        assert_eq!(alignment_score(StrategyKey::MomentumScalping, &inputs), 0.0);
        assert_eq!(alignment_score(StrategyKey::RangeTrading, &inputs), 0.0);
    }

    #[test]
    fn test_rsi_extremity() {
        let mut inputs = inputs(vec![100.0; 60]);
        inputs.rsi = 50.0;
        assert_eq!(alignment_score(StrategyKey::RsiDivergence, &inputs), 0.0);
        inputs.rsi = 15.0;
        assert_eq!(alignment_score(StrategyKey::RsiDivergence, &inputs), 25.0);
        inputs.rsi = 75.0;
        assert_eq!(alignment_score(StrategyKey::RsiDivergence, &inputs), 15.0);
    }

    #[test]
    fn test_ties_go_to_catalog_order() {
        // Flat: no backtest signals for most rules, so ties are likely.
        let inputs = inputs(vec![100.0; 200]);
        let selected = StrategyEngine::default().select(&inputs);
        for alt in &selected.alternatives {
            if alt.score == selected.score {
                assert!(catalog_position(alt.key) > catalog_position(selected.descriptor.key));
            }
        }
    }
}
