//! Per-timeframe signal derivation.
//!
//! One series in, one [`TimeframeSignal`] out. Direction comes from ordered
//! rule tables selected by regime; confidence is a base of 65 plus a set of
//! independent additive terms, clamped to 55-95.

use crate::error::Result;
use crate::services::market_data::MarketDataProvider;
use crate::services::signals::indicators::{
    market_condition, relative_volume, rsi, sma, trend_strength, volatility, BollingerBands,
    Macd, SignalLineMode,
};
use crate::services::signals::Indicator;
use crate::types::{
    BollingerReading, Direction, MacdReading, MarketCondition, MarketSeries, TechnicalScores,
    Timeframe, TimeframeSignal,
};
use std::sync::Arc;
use tracing::debug;

pub const BASE_CONFIDENCE: f64 = 65.0;
pub const MIN_LEAF_CONFIDENCE: f64 = 55.0;
pub const MAX_LEAF_CONFIDENCE: f64 = 95.0;

/// Above this volatility, ranging markets are traded as mean reversion.
const MEAN_REVERSION_VOLATILITY: f64 = 0.02;

/// Above this trend strength, the fallback bias follows momentum.
const MOMENTUM_BIAS_STRENGTH: f64 = 55.0;

/// RSI smoothed over three periods, weighted 3/2/1 and rounded.
pub fn smoothed_rsi(prices: &[f64]) -> f64 {
    ((3.0 * rsi(prices, 14) + 2.0 * rsi(prices, 16) + rsi(prices, 18)) / 6.0).round()
}

/// Readings the direction rules and confidence terms look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafInputs {
    pub price: f64,
    pub sma8: f64,
    pub sma21: f64,
    pub rsi: f64,
    pub macd: MacdReading,
    pub prev_macd: MacdReading,
    pub bollinger: BollingerReading,
    pub volatility: f64,
    pub trend_strength: f64,
    pub market_condition: MarketCondition,
    /// Price three samples back.
    pub lookback_price: f64,
    pub relative_volume: f64,
}

impl LeafInputs {
    pub fn from_series(series: &MarketSeries, mode: SignalLineMode) -> Self {
        let prices = &series.prices;
        let previous = &prices[..prices.len().saturating_sub(1)];
        let price = series.last_price().unwrap_or(0.0);
        let macd = Macd::default().with_mode(mode);

        Self {
            price,
            sma8: sma(prices, 8),
            sma21: sma(prices, 21),
            rsi: smoothed_rsi(prices),
            macd: macd.calculate(prices),
            prev_macd: macd.calculate(previous),
            bollinger: BollingerBands::default().calculate(prices),
            volatility: volatility(prices, 14),
            trend_strength: trend_strength(prices, &series.volumes).score,
            market_condition: market_condition(prices, &series.volumes),
            lookback_price: prices
                .len()
                .checked_sub(4)
                .map(|i| prices[i])
                .unwrap_or(price),
            relative_volume: relative_volume(&series.volumes, 5),
        }
    }

    /// Position of the price inside the bands (0 = lower, 1 = upper).
    /// `None` when the bands have collapsed.
    pub fn band_position(&self) -> Option<f64> {
        if self.bollinger.is_degenerate() {
            return None;
        }
        Some((self.price - self.bollinger.lower) / (self.bollinger.upper - self.bollinger.lower))
    }
}

/// A `(predicate, direction)` row.
pub struct DirectionRule {
    pub when: fn(&LeafInputs) -> bool,
    pub direction: Direction,
}

/// Rows evaluated in order; `otherwise` decides when nothing matches.
pub struct DirectionTable {
    pub rules: &'static [DirectionRule],
    pub otherwise: fn(&LeafInputs) -> Direction,
}

impl DirectionTable {
    pub fn decide(&self, inputs: &LeafInputs) -> Direction {
        self.rules
            .iter()
            .find(|rule| (rule.when)(inputs))
            .map(|rule| rule.direction)
            .unwrap_or_else(|| (self.otherwise)(inputs))
    }
}

/// Follow short-term momentum in a trending tape, otherwise lean back
/// toward the band middle.
fn trend_bias(i: &LeafInputs) -> Direction {
    if i.trend_strength > MOMENTUM_BIAS_STRENGTH {
        if i.price >= i.sma8 {
            Direction::Call
        } else {
            Direction::Put
        }
    } else if i.price <= i.bollinger.middle {
        Direction::Call
    } else {
        Direction::Put
    }
}

fn always_call(_: &LeafInputs) -> Direction {
    Direction::Call
}

fn always_put(_: &LeafInputs) -> Direction {
    Direction::Put
}

pub static UPTREND_RULES: DirectionTable = DirectionTable {
    rules: &[
        DirectionRule {
            when: |i| i.rsi < 30.0,
            direction: Direction::Call,
        },
        DirectionRule {
            when: |i| i.macd.is_bullish(),
            direction: Direction::Call,
        },
        DirectionRule {
            when: |i| i.rsi > 70.0 && i.trend_strength < 60.0,
            direction: Direction::Put,
        },
    ],
    otherwise: always_call,
};

pub static DOWNTREND_RULES: DirectionTable = DirectionTable {
    rules: &[
        DirectionRule {
            when: |i| i.rsi > 70.0,
            direction: Direction::Put,
        },
        DirectionRule {
            when: |i| i.macd.is_bearish(),
            direction: Direction::Put,
        },
        DirectionRule {
            when: |i| i.rsi < 30.0 && i.trend_strength < 60.0,
            direction: Direction::Call,
        },
    ],
    otherwise: always_put,
};

pub static MEAN_REVERSION_RULES: DirectionTable = DirectionTable {
    rules: &[
        DirectionRule {
            when: |i| i.price < i.bollinger.lower * 1.01 && i.rsi < 35.0,
            direction: Direction::Call,
        },
        DirectionRule {
            when: |i| i.price > i.bollinger.upper * 0.99 && i.rsi > 65.0,
            direction: Direction::Put,
        },
    ],
    otherwise: trend_bias,
};

pub static RANGE_RULES: DirectionTable = DirectionTable {
    rules: &[
        // RSI and band position agree
        DirectionRule {
            when: |i| i.rsi < 40.0 && i.price < i.bollinger.middle,
            direction: Direction::Call,
        },
        DirectionRule {
            when: |i| i.rsi > 60.0 && i.price > i.bollinger.middle,
            direction: Direction::Put,
        },
        // Histogram growing away from zero
        DirectionRule {
            when: |i| i.macd.histogram > 0.0 && i.macd.histogram > i.prev_macd.histogram,
            direction: Direction::Call,
        },
        DirectionRule {
            when: |i| i.macd.histogram < 0.0 && i.macd.histogram < i.prev_macd.histogram,
            direction: Direction::Put,
        },
    ],
    otherwise: trend_bias,
};

/// The table that applies to the current regime.
pub fn direction_table(inputs: &LeafInputs) -> &'static DirectionTable {
    match inputs.market_condition {
        MarketCondition::StrongTrendUp | MarketCondition::TrendUp => &UPTREND_RULES,
        MarketCondition::StrongTrendDown | MarketCondition::TrendDown => &DOWNTREND_RULES,
        MarketCondition::Sideways | MarketCondition::Volatile | MarketCondition::Unknown => {
            if inputs.volatility > MEAN_REVERSION_VOLATILITY {
                &MEAN_REVERSION_RULES
            } else {
                &RANGE_RULES
            }
        }
    }
}

fn condition_alignment(i: &LeafInputs, direction: Direction) -> f64 {
    match i.market_condition {
        c if c.trend_direction() == Some(direction) => {
            if c.is_strong() {
                15.0
            } else {
                10.0
            }
        }
        MarketCondition::Volatile => -10.0,
        MarketCondition::Sideways => {
            // In a range the RSI side of 50 points the way price should revert.
            let rsi_bias = if i.rsi < 50.0 {
                Some(Direction::Call)
            } else if i.rsi > 50.0 {
                Some(Direction::Put)
            } else {
                None
            };
            match rsi_bias {
                Some(bias) if bias != direction => -5.0,
                _ => 0.0,
            }
        }
        _ => 0.0,
    }
}

fn rsi_extreme(i: &LeafInputs, direction: Direction) -> f64 {
    let favoured = if i.rsi < 30.0 {
        Direction::Call
    } else if i.rsi > 70.0 {
        Direction::Put
    } else {
        return 0.0;
    };
    if favoured == direction {
        10.0
    } else {
        -15.0
    }
}

fn macd_agreement(i: &LeafInputs, direction: Direction) -> f64 {
    let agrees = match direction {
        Direction::Call => i.macd.is_bullish(),
        Direction::Put => i.macd.is_bearish(),
    };
    if agrees {
        10.0
    } else {
        0.0
    }
}

fn bollinger_proximity(i: &LeafInputs, direction: Direction) -> f64 {
    let Some(position) = i.band_position() else {
        return 0.0;
    };
    // Distance from the band the direction wants to bounce off.
    let from_favourable = match direction {
        Direction::Call => position,
        Direction::Put => 1.0 - position,
    };
    if from_favourable < 0.2 {
        10.0
    } else if from_favourable > 0.8 {
        -10.0
    } else {
        0.0
    }
}

fn trend_strength_term(i: &LeafInputs) -> f64 {
    if i.trend_strength > 75.0 {
        ((i.trend_strength - 75.0) * 0.48).min(12.0)
    } else if i.trend_strength < 40.0 {
        -8.0
    } else {
        0.0
    }
}

fn volatility_term(i: &LeafInputs) -> f64 {
    if i.volatility > 0.015 {
        -((i.volatility - 0.015) * 1_000.0).min(15.0)
    } else if i.volatility < 0.005 {
        5.0
    } else {
        0.0
    }
}

/// A short move against an established trend that has not broken it.
fn pullback(i: &LeafInputs, direction: Direction) -> f64 {
    if i.market_condition.trend_direction() != Some(direction) {
        return 0.0;
    }
    let is_pullback = match direction {
        Direction::Call => i.price < i.lookback_price && i.price > i.sma21,
        Direction::Put => i.price > i.lookback_price && i.price < i.sma21,
    };
    if is_pullback {
        7.0
    } else {
        0.0
    }
}

/// Leaf confidence for `direction`, clamped to 55-95.
pub fn leaf_confidence(i: &LeafInputs, direction: Direction) -> f64 {
    let total = BASE_CONFIDENCE
        + condition_alignment(i, direction)
        + rsi_extreme(i, direction)
        + macd_agreement(i, direction)
        + bollinger_proximity(i, direction)
        + trend_strength_term(i)
        + volatility_term(i)
        + pullback(i, direction);
    total.clamp(MIN_LEAF_CONFIDENCE, MAX_LEAF_CONFIDENCE)
}

/// Inputs plus the decision derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafReading {
    pub inputs: LeafInputs,
    pub direction: Direction,
    pub confidence: f64,
}

impl LeafReading {
    pub fn evaluate(series: &MarketSeries, mode: SignalLineMode) -> Self {
        let inputs = LeafInputs::from_series(series, mode);
        let direction = direction_table(&inputs).decide(&inputs);
        Self {
            inputs,
            direction,
            confidence: leaf_confidence(&inputs, direction),
        }
    }

    pub fn into_signal(self, timeframe: Timeframe) -> TimeframeSignal {
        TimeframeSignal::new(
            timeframe,
            self.direction,
            self.confidence,
            self.inputs.trend_strength,
            self.inputs.market_condition,
        )
    }

    /// How much each component backs the chosen direction.
    pub fn technical_scores(&self) -> TechnicalScores {
        let i = &self.inputs;
        let rsi = match self.direction {
            Direction::Call => 100.0 - i.rsi,
            Direction::Put => i.rsi,
        };
        let macd = if macd_agreement(i, self.direction) > 0.0 {
            75.0
        } else if macd_agreement(i, self.direction.opposite()) > 0.0 {
            25.0
        } else {
            50.0
        };
        let bollinger = match (i.band_position(), self.direction) {
            (None, _) => 50.0,
            (Some(p), Direction::Call) => (1.0 - p) * 100.0,
            (Some(p), Direction::Put) => p * 100.0,
        };
        let volume = i.relative_volume * 50.0;

        let mut scores = TechnicalScores {
            rsi: rsi.clamp(0.0, 100.0),
            macd,
            bollinger: bollinger.clamp(0.0, 100.0),
            trend: i.trend_strength,
            volume: volume.clamp(0.0, 100.0),
            overall: 0.0,
        };
        scores.overall =
            (scores.rsi + scores.macd + scores.bollinger + scores.trend + scores.volume) / 5.0;
        scores
    }
}

/// Turns market data for one (symbol, timeframe) into a [`TimeframeSignal`].
pub struct TimeframeAnalyzer {
    provider: Arc<dyn MarketDataProvider>,
    sample_count: usize,
    signal_line: SignalLineMode,
}

impl TimeframeAnalyzer {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        sample_count: usize,
        signal_line: SignalLineMode,
    ) -> Self {
        Self {
            provider,
            sample_count,
            signal_line,
        }
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    pub fn signal_line(&self) -> SignalLineMode {
        self.signal_line
    }

    /// Fetch a series and derive its signal.
    pub fn analyze(&self, symbol: &str, timeframe: Timeframe) -> Result<TimeframeSignal> {
        let series = self.provider.series(symbol, timeframe, self.sample_count)?;
        let signal = self.derive_signal(timeframe, &series);
        debug!(
            "{} {}: {} at {:.0} ({:?})",
            symbol, timeframe, signal.direction, signal.confidence, signal.market_condition
        );
        Ok(signal)
    }

    /// Derive a signal from an already-fetched series.
    pub fn derive_signal(&self, timeframe: Timeframe, series: &MarketSeries) -> TimeframeSignal {
        LeafReading::evaluate(series, self.signal_line).into_signal(timeframe)
    }
}
