//! Multi-timeframe confluence.
//!
//! Every registered timeframe casts a vote of `confidence × weight` for its
//! direction. Votes are held as fixed-point integers so the tally is the same
//! whatever order the timeframes are visited in.

use crate::error::Result;
use crate::services::clock::Clock;
use crate::services::signals::analyzer::{LeafReading, TimeframeAnalyzer};
use crate::services::signals::indicators::support_resistance;
use crate::services::signals::relative_distance;
use crate::services::signals::timing::{entry_offset_seconds, entry_time, optimal_expiry};
use crate::types::{
    ConfluenceDirection, ConfluenceResult, Direction, PrimarySignal, SupportResistance,
    Timeframe, TimeframeSignal,
};
use chrono::Duration;
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Fixed-point scale for vote masses.
const MASS_SCALE: f64 = 1_000_000.0;

/// Share difference needed to call a direction.
pub const DIRECTION_THRESHOLD: f64 = 0.15;

pub const MAX_CONFLUENCE: f64 = 95.0;

pub const REQUESTED_WEIGHT: f64 = 1.8;
pub const LONGER_WEIGHT: f64 = 1.4;
pub const OTHER_WEIGHT: f64 = 1.0;

/// Strength at which a timeframe votes with its full base weight.
const REFERENCE_STRENGTH: f64 = 60.0;

pub const MIN_PRIMARY_CONFIDENCE: f64 = 60.0;
pub const MAX_PRIMARY_CONFIDENCE: f64 = 96.0;

const SUPPORT_RESISTANCE_LOOKBACK: usize = 50;

/// Vote weight of `signal` when `requested` is being analyzed.
pub fn vote_weight(signal: &TimeframeSignal, requested: Timeframe) -> f64 {
    let base = if signal.timeframe == requested {
        REQUESTED_WEIGHT
    } else if signal.timeframe.minutes() > requested.minutes() {
        LONGER_WEIGHT
    } else {
        OTHER_WEIGHT
    };
    base * (signal.strength / REFERENCE_STRENGTH)
}

/// Accumulated call and put vote mass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub call: i64,
    pub put: i64,
}

impl VoteTally {
    pub fn from_signal(signal: &TimeframeSignal, requested: Timeframe) -> Self {
        let mass = (signal.confidence * vote_weight(signal, requested) * MASS_SCALE).round() as i64;
        match signal.direction {
            Direction::Call => Self { call: mass, put: 0 },
            Direction::Put => Self { call: 0, put: mass },
        }
    }

    pub fn total(&self) -> i64 {
        self.call + self.put
    }

    /// `callShare - putShare`, 0 when nothing voted.
    pub fn share_difference(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.call - self.put) as f64 / total as f64
    }

    pub fn direction(&self) -> ConfluenceDirection {
        let diff = self.share_difference();
        if diff > DIRECTION_THRESHOLD {
            ConfluenceDirection::Call
        } else if diff < -DIRECTION_THRESHOLD {
            ConfluenceDirection::Put
        } else {
            ConfluenceDirection::Neutral
        }
    }

    /// Agreement level, 0-95.
    pub fn confluence(&self) -> u8 {
        (self.share_difference().abs() * 100.0)
            .min(MAX_CONFLUENCE)
            .round() as u8
    }
}

impl Add for VoteTally {
    type Output = VoteTally;

    fn add(self, other: VoteTally) -> VoteTally {
        VoteTally {
            call: self.call + other.call,
            put: self.put + other.put,
        }
    }
}

impl Sum for VoteTally {
    fn sum<I: Iterator<Item = VoteTally>>(iter: I) -> Self {
        iter.fold(VoteTally::default(), Add::add)
    }
}

/// Tally the votes of `signals` for `requested`.
pub fn tally(signals: &[TimeframeSignal], requested: Timeframe) -> VoteTally {
    signals
        .iter()
        .map(|signal| VoteTally::from_signal(signal, requested))
        .sum()
}

/// Final confidence of the primary signal, clamped to 60-96.
pub fn primary_confidence(
    leaf: &LeafReading,
    aggregate: ConfluenceDirection,
    confluence: u8,
    levels: &SupportResistance,
) -> f64 {
    let inputs = &leaf.inputs;
    let agreement = f64::from(confluence) / MAX_CONFLUENCE;

    let confluence_shift = match aggregate.as_direction() {
        Some(direction) if direction == leaf.direction => agreement * 15.0,
        Some(_) => -(agreement * 20.0),
        None => -5.0,
    };

    let volatility_penalty = if inputs.volatility > 0.015 {
        ((inputs.volatility - 0.015) * 1_000.0).min(15.0)
    } else {
        0.0
    };

    let trend_bonus = if inputs.trend_strength > 70.0
        && inputs.market_condition.trend_direction() == Some(leaf.direction)
    {
        5.0
    } else {
        0.0
    };

    let level = match leaf.direction {
        Direction::Call => levels.support,
        Direction::Put => levels.resistance,
    };
    let level_bonus = if relative_distance(inputs.price, level) <= 0.01 {
        3.0
    } else {
        0.0
    };

    (leaf.confidence + confluence_shift - volatility_penalty + trend_bonus + level_bonus)
        .clamp(MIN_PRIMARY_CONFIDENCE, MAX_PRIMARY_CONFIDENCE)
}

/// Runs the analyzer over the timeframe registry and builds the aggregate.
pub struct ConfluenceAggregator {
    analyzer: TimeframeAnalyzer,
    timeframes: Vec<Timeframe>,
    primary_sample_count: usize,
    clock: Arc<dyn Clock>,
}

impl ConfluenceAggregator {
    pub fn new(
        analyzer: TimeframeAnalyzer,
        timeframes: Vec<Timeframe>,
        primary_sample_count: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            analyzer,
            timeframes,
            primary_sample_count,
            clock,
        }
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// One signal per registered timeframe, in registry order.
    pub fn timeframe_signals(&self, symbol: &str) -> Result<Vec<TimeframeSignal>> {
        self.timeframes
            .iter()
            .map(|timeframe| self.analyzer.analyze(symbol, *timeframe))
            .collect()
    }

    /// Full analysis: per-timeframe votes plus a fresh primary signal.
    pub fn analyze(&self, symbol: &str, requested: Timeframe) -> Result<ConfluenceResult> {
        let timeframes = self.timeframe_signals(symbol)?;
        let votes = tally(&timeframes, requested);
        let direction = votes.direction();
        let confluence = votes.confluence();

        let primary_signal = self.build_primary(symbol, requested, direction, confluence)?;
        debug!(
            "{} {} confluence: {:?} {} (primary {} at {:.0})",
            symbol,
            requested,
            direction,
            confluence,
            primary_signal.direction,
            primary_signal.confidence
        );

        Ok(ConfluenceResult {
            symbol: symbol.to_uppercase(),
            timeframe: requested,
            countdown_seconds: primary_signal.countdown_seconds,
            generated_at: primary_signal.generated_at,
            primary_signal,
            timeframes,
            overall_confluence: confluence,
            confluence_direction: direction,
        })
    }

    /// Refresh the votes of `previous`, keeping its primary signal.
    pub fn realtime_update(&self, previous: &ConfluenceResult) -> Result<ConfluenceResult> {
        let timeframes = self.timeframe_signals(&previous.symbol)?;
        let votes = tally(&timeframes, previous.timeframe);

        Ok(ConfluenceResult {
            timeframes,
            overall_confluence: votes.confluence(),
            confluence_direction: votes.direction(),
            ..previous.clone()
        })
    }

    /// Detailed signal for the requested timeframe from its own series.
    pub fn build_primary(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        aggregate: ConfluenceDirection,
        confluence: u8,
    ) -> Result<PrimarySignal> {
        let series = self
            .analyzer
            .provider()
            .series(symbol, timeframe, self.primary_sample_count)?;
        let leaf = LeafReading::evaluate(&series, self.analyzer.signal_line());
        let levels = support_resistance(&series.prices, SUPPORT_RESISTANCE_LOOKBACK);
        let inputs = &leaf.inputs;

        let now = self.clock.now();
        let countdown_seconds = entry_offset_seconds(now);
        let entry = entry_time(now);
        let expiry_minutes = optimal_expiry(timeframe, inputs.volatility, inputs.trend_strength);

        let mut indicators = vec![
            "RSI".to_string(),
            "MACD".to_string(),
            "Bollinger Bands".to_string(),
            "Trend Strength".to_string(),
            "Volatility".to_string(),
            "Support/Resistance".to_string(),
        ];
        if aggregate != ConfluenceDirection::Neutral {
            indicators.push("Multi-Timeframe Confluence".to_string());
        }

        Ok(PrimarySignal {
            id: Uuid::new_v4(),
            symbol: symbol.to_uppercase(),
            timeframe,
            direction: leaf.direction,
            confidence: primary_confidence(&leaf, aggregate, confluence, &levels),
            current_price: inputs.price,
            entry_time: entry,
            expiry_time: entry + Duration::minutes(i64::from(expiry_minutes)),
            expiry_minutes,
            countdown_seconds,
            support: levels.support,
            resistance: levels.resistance,
            volatility: inputs.volatility,
            trend_strength: inputs.trend_strength,
            market_condition: inputs.market_condition,
            technical_scores: leaf.technical_scores(),
            indicators,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketCondition;

    fn signal(timeframe: Timeframe, direction: Direction, confidence: f64) -> TimeframeSignal {
        TimeframeSignal::new(timeframe, direction, confidence, 60.0, MarketCondition::TrendUp)
    }

    #[test]
    fn test_weights() {
        let s = signal(Timeframe::FiveMinutes, Direction::Call, 80.0);
        assert_eq!(vote_weight(&s, Timeframe::FiveMinutes), REQUESTED_WEIGHT);
        assert_eq!(vote_weight(&s, Timeframe::FifteenMinutes), OTHER_WEIGHT);
        assert_eq!(vote_weight(&s, Timeframe::OneMinute), LONGER_WEIGHT);

        let weak = TimeframeSignal::new(
            Timeframe::FiveMinutes,
            Direction::Call,
            80.0,
            30.0,
            MarketCondition::Sideways,
        );
        assert_eq!(vote_weight(&weak, Timeframe::FiveMinutes), REQUESTED_WEIGHT / 2.0);
    }

    #[test]
    fn test_unanimous_call() {
        let signals: Vec<_> = [
            Timeframe::OneMinute,
            Timeframe::FiveMinutes,
            Timeframe::FifteenMinutes,
            Timeframe::ThirtyMinutes,
            Timeframe::OneHour,
        ]
        .into_iter()
        .map(|tf| signal(tf, Direction::Call, 90.0))
        .collect();
        let votes = tally(&signals, Timeframe::FiveMinutes);
        assert_eq!(votes.direction(), ConfluenceDirection::Call);
        assert_eq!(votes.confluence(), 95);
    }

    #[test]
    fn test_split_vote_is_neutral() {
        let signals = vec![
            signal(Timeframe::OneMinute, Direction::Call, 80.0),
            signal(Timeframe::FifteenMinutes, Direction::Put, 80.0),
        ];
        // Equal weights relative to a requested timeframe longer than both.
        let votes = tally(&signals, Timeframe::OneHour);
        assert_eq!(votes.call, votes.put);
        assert_eq!(votes.direction(), ConfluenceDirection::Neutral);
        assert_eq!(votes.confluence(), 0);
    }

    #[test]
    fn test_zero_mass_is_neutral() {
        let signals = vec![TimeframeSignal::new(
            Timeframe::OneMinute,
            Direction::Call,
            80.0,
            0.0,
            MarketCondition::Sideways,
        )];
        let votes = tally(&signals, Timeframe::OneMinute);
        assert_eq!(votes.total(), 0);
        assert_eq!(votes.direction(), ConfluenceDirection::Neutral);
        assert_eq!(votes.confluence(), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        // 0.575 vs 0.425 of the mass: difference exactly 0.15.
        let votes = VoteTally { call: 575, put: 425 };
        assert_eq!(votes.direction(), ConfluenceDirection::Neutral);
        assert_eq!(votes.confluence(), 15);

        let votes = VoteTally { call: 576, put: 424 };
        assert_eq!(votes.direction(), ConfluenceDirection::Call);
    }

    #[test]
    fn test_tally_is_order_independent() {
        let mut signals = vec![
            signal(Timeframe::OneMinute, Direction::Call, 71.3),
            signal(Timeframe::FiveMinutes, Direction::Put, 88.1),
            signal(Timeframe::FifteenMinutes, Direction::Call, 63.7),
            signal(Timeframe::ThirtyMinutes, Direction::Put, 90.0),
            signal(Timeframe::OneHour, Direction::Call, 55.5),
        ];
        let forward = tally(&signals, Timeframe::FifteenMinutes);
        signals.reverse();
        assert_eq!(tally(&signals, Timeframe::FifteenMinutes), forward);
        signals.swap(0, 3);
        assert_eq!(tally(&signals, Timeframe::FifteenMinutes), forward);
    }

    #[test]
    fn test_tally_addition() {
        let a = VoteTally { call: 3, put: 1 };
        let b = VoteTally { call: 2, put: 5 };
        assert_eq!(a + b, b + a);
        assert_eq!((a + b).total(), 11);
    }
}
