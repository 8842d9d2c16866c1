//! Market regime classification.
//!
//! The classifier is an ordered decision table: each rule is a predicate
//! over [`ConditionInputs`] paired with the regime it selects. Rules are
//! evaluated top to bottom and the first match wins. The last rule always
//! matches, so every series with at least [`MIN_CONDITION_SAMPLES`] samples
//! gets one of the six named regimes.

use crate::services::signals::indicators::{
    ema::ema, macd::macd, rsi::rsi, sma::sma, volatility::volatility,
};
use crate::services::signals::{mean, tail};
use crate::types::{MacdReading, MarketCondition};

/// Below this many samples the regime is UNKNOWN.
pub const MIN_CONDITION_SAMPLES: usize = 50;

/// Everything the decision table looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionInputs {
    pub price: f64,
    pub ma8: f64,
    pub ma21: f64,
    pub ma50: f64,
    /// Falls back to MA50 when fewer than 100 samples exist.
    pub ma100: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub prev_ema9: f64,
    pub prev_ema21: f64,
    pub rsi: f64,
    pub macd: MacdReading,
    pub prev_macd: MacdReading,
    /// 14-sample return volatility.
    pub short_volatility: f64,
    /// Short volatility relative to 50-sample volatility.
    pub volatility_ratio: f64,
    /// Last 5 volumes relative to the 20-sample average.
    pub volume_ratio: f64,
}

impl ConditionInputs {
    pub fn from_series(prices: &[f64], volumes: &[f64]) -> Self {
        let previous = &prices[..prices.len().saturating_sub(1)];
        let price = prices.last().copied().unwrap_or(0.0);

        let ma50 = sma(prices, 50);
        let ma100 = if prices.len() >= 100 { sma(prices, 100) } else { ma50 };

        let short_volatility = volatility(prices, 14);
        let long_volatility = volatility(prices, 49);
        let volatility_ratio = if long_volatility > f64::EPSILON {
            short_volatility / long_volatility
        } else {
            1.0
        };

        let volume_baseline = mean(tail(volumes, 20));
        let volume_ratio = if volume_baseline > f64::EPSILON {
            mean(tail(volumes, 5)) / volume_baseline
        } else {
            1.0
        };

        Self {
            price,
            ma8: sma(prices, 8),
            ma21: sma(prices, 21),
            ma50,
            ma100,
            ema9: ema(prices, 9),
            ema21: ema(prices, 21),
            prev_ema9: ema(previous, 9),
            prev_ema21: ema(previous, 21),
            rsi: rsi(prices, 14),
            macd: macd(prices),
            prev_macd: macd(previous),
            short_volatility,
            volatility_ratio,
            volume_ratio,
        }
    }

    fn ema_bullish(&self) -> bool {
        self.ema9 > self.ema21
    }

    fn ema_bearish(&self) -> bool {
        self.ema9 < self.ema21
    }

    fn ema_bullish_cross(&self) -> bool {
        self.prev_ema9 <= self.prev_ema21 && self.ema9 > self.ema21
    }

    fn ema_bearish_cross(&self) -> bool {
        self.prev_ema9 >= self.prev_ema21 && self.ema9 < self.ema21
    }

    fn macd_bullish_cross(&self) -> bool {
        self.prev_macd.histogram <= 0.0 && self.macd.histogram > 0.0
    }

    fn macd_bearish_cross(&self) -> bool {
        self.prev_macd.histogram >= 0.0 && self.macd.histogram < 0.0
    }
}

/// One row of the decision table.
pub struct ConditionRule {
    pub name: &'static str,
    pub condition: MarketCondition,
    pub matches: fn(&ConditionInputs) -> bool,
}

fn is_volatile(i: &ConditionInputs) -> bool {
    i.short_volatility > 0.03
        || (i.volatility_ratio > 1.8 && i.short_volatility > 0.01)
        || (i.volume_ratio > 2.5 && i.short_volatility > 0.015)
}

fn is_strong_uptrend(i: &ConditionInputs) -> bool {
    i.price > i.ma8
        && i.ma8 > i.ma21
        && i.ma21 > i.ma50
        && i.ma50 >= i.ma100
        && i.rsi > 55.0
        && i.macd.line > 0.0
}

fn is_strong_downtrend(i: &ConditionInputs) -> bool {
    i.price < i.ma8
        && i.ma8 < i.ma21
        && i.ma21 < i.ma50
        && i.ma50 <= i.ma100
        && i.rsi < 45.0
        && i.macd.line < 0.0
}

fn is_uptrend(i: &ConditionInputs) -> bool {
    i.ma8 > i.ma21
        && i.price > i.ma21
        && (i.ema_bullish() || i.ema_bullish_cross() || i.macd_bullish_cross())
        && i.rsi >= 48.0
}

fn is_downtrend(i: &ConditionInputs) -> bool {
    i.ma8 < i.ma21
        && i.price < i.ma21
        && (i.ema_bearish() || i.ema_bearish_cross() || i.macd_bearish_cross())
        && i.rsi <= 52.0
}

fn always(_: &ConditionInputs) -> bool {
    true
}

/// The decision table, in priority order.
pub const CONDITION_RULES: &[ConditionRule] = &[
    ConditionRule {
        name: "volatility spike",
        condition: MarketCondition::Volatile,
        matches: is_volatile,
    },
    ConditionRule {
        name: "stacked averages up",
        condition: MarketCondition::StrongTrendUp,
        matches: is_strong_uptrend,
    },
    ConditionRule {
        name: "stacked averages down",
        condition: MarketCondition::StrongTrendDown,
        matches: is_strong_downtrend,
    },
    ConditionRule {
        name: "short averages rising",
        condition: MarketCondition::TrendUp,
        matches: is_uptrend,
    },
    ConditionRule {
        name: "short averages falling",
        condition: MarketCondition::TrendDown,
        matches: is_downtrend,
    },
    ConditionRule {
        name: "range",
        condition: MarketCondition::Sideways,
        matches: always,
    },
];

/// Classify already-computed inputs.
pub fn classify(inputs: &ConditionInputs) -> MarketCondition {
    CONDITION_RULES
        .iter()
        .find(|rule| (rule.matches)(inputs))
        .map(|rule| rule.condition)
        .unwrap_or(MarketCondition::Sideways)
}

/// Classify the regime of a series.
pub fn market_condition(prices: &[f64], volumes: &[f64]) -> MarketCondition {
    if prices.len() < MIN_CONDITION_SAMPLES {
        return MarketCondition::Unknown;
    }
    classify(&ConditionInputs::from_series(prices, volumes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volumes(len: usize) -> Vec<f64> {
        vec![1_000.0; len]
    }

    #[test]
    fn test_short_series_unknown() {
        let prices = vec![100.0; 49];
        assert_eq!(market_condition(&prices, &volumes(49)), MarketCondition::Unknown);
    }

    #[test]
    fn test_flat_series_sideways() {
        let prices = vec![100.0; 200];
        assert_eq!(market_condition(&prices, &volumes(200)), MarketCondition::Sideways);
    }

    #[test]
    fn test_steady_rise_strong_uptrend() {
        let prices: Vec<f64> = (0..200).map(|i| 100.0 * 1.002f64.powi(i)).collect();
        assert_eq!(
            market_condition(&prices, &volumes(200)),
            MarketCondition::StrongTrendUp
        );
    }

    #[test]
    fn test_steady_fall_strong_downtrend() {
        let prices: Vec<f64> = (0..200).map(|i| 100.0 * 0.998f64.powi(i)).collect();
        assert_eq!(
            market_condition(&prices, &volumes(200)),
            MarketCondition::StrongTrendDown
        );
    }

    #[test]
    fn test_wild_swings_volatile() {
        let prices: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 100.0 } else { 106.0 })
            .collect();
        assert_eq!(market_condition(&prices, &volumes(200)), MarketCondition::Volatile);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Stacked averages and a volatility spike: volatility is declared first.
        let mut inputs = ConditionInputs::from_series(
            &(0..200).map(|i| 100.0 * 1.002f64.powi(i)).collect::<Vec<_>>(),
            &volumes(200),
        );
        assert_eq!(classify(&inputs), MarketCondition::StrongTrendUp);
        inputs.short_volatility = 0.05;
        assert_eq!(classify(&inputs), MarketCondition::Volatile);
    }

    #[test]
    fn test_classifier_total_for_long_series() {
        for seed in 0..20u64 {
            let prices: Vec<f64> = (0..120)
                .map(|i| 100.0 + (((i as u64 * 7919 + seed * 104_729) % 23) as f64 - 11.0) * 0.3)
                .collect();
            let condition = market_condition(&prices, &volumes(120));
            assert_ne!(condition, MarketCondition::Unknown);
        }
    }

    #[test]
    fn test_rules_end_with_catch_all() {
        let last = CONDITION_RULES.last().unwrap();
        assert_eq!(last.condition, MarketCondition::Sideways);
    }
}
