use crate::types::MarketCondition;
use serde::{Deserialize, Serialize};

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdReading {
    /// Histogram positive and line above signal.
    pub fn is_bullish(&self) -> bool {
        self.histogram > 0.0 && self.line > self.signal
    }

    /// Histogram negative and line below signal.
    pub fn is_bearish(&self) -> bool {
        self.histogram < 0.0 && self.line < self.signal
    }
}

/// Bollinger band levels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerReading {
    /// Band width relative to the middle band.
    pub fn width_ratio(&self) -> f64 {
        if self.middle.abs() > f64::EPSILON {
            (self.upper - self.lower) / self.middle
        } else {
            0.0
        }
    }

    /// Collapsed bands carry no positional information.
    pub fn is_degenerate(&self) -> bool {
        self.upper - self.lower <= f64::EPSILON
    }
}

/// Qualitative trend-strength tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendTier {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl TrendTier {
    /// Tier for a 0-100 score (thresholds 40/60/80).
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::VeryStrong,
            s if s >= 60.0 => Self::Strong,
            s if s >= 40.0 => Self::Moderate,
            _ => Self::Weak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Weak => "Weak",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
            Self::VeryStrong => "Very Strong",
        }
    }
}

/// Trend strength score (0-100) and its tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStrength {
    pub score: f64,
    pub tier: TrendTier,
}

impl TrendStrength {
    pub fn new(score: f64) -> Self {
        let score = score.clamp(0.0, 100.0);
        Self {
            score,
            tier: TrendTier::from_score(score),
        }
    }
}

/// Nearest support below and resistance above the last price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
    /// Pivots that landed near the support level.
    pub support_touches: u32,
    /// Pivots that landed near the resistance level.
    pub resistance_touches: u32,
}

/// Fibonacci retracement levels of the lookback swing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    /// (ratio, price) pairs, ratio ascending.
    pub levels: Vec<(f64, f64)>,
}

impl FibonacciLevels {
    /// Relative distance from `price` to the closest level.
    pub fn nearest_distance(&self, price: f64) -> Option<f64> {
        if price.abs() <= f64::EPSILON {
            return None;
        }
        self.levels
            .iter()
            .map(|(_, level)| ((price - level) / price).abs())
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Ichimoku conversion and base lines, now and one sample earlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuReading {
    pub tenkan: f64,
    pub kijun: f64,
    pub prev_tenkan: f64,
    pub prev_kijun: f64,
}

impl IchimokuReading {
    /// Tenkan crossed above Kijun on the last sample.
    pub fn bullish_cross(&self) -> bool {
        self.prev_tenkan <= self.prev_kijun && self.tenkan > self.kijun
    }

    /// Tenkan crossed below Kijun on the last sample.
    pub fn bearish_cross(&self) -> bool {
        self.prev_tenkan >= self.prev_kijun && self.tenkan < self.kijun
    }
}

/// Derived metrics for one series. Recomputed per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSet {
    pub price: f64,
    pub rsi: f64,
    pub macd: MacdReading,
    pub bollinger: BollingerReading,
    pub volatility: f64,
    pub trend_strength: TrendStrength,
    pub market_condition: MarketCondition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_tier_thresholds() {
        assert_eq!(TrendTier::from_score(0.0), TrendTier::Weak);
        assert_eq!(TrendTier::from_score(39.9), TrendTier::Weak);
        assert_eq!(TrendTier::from_score(40.0), TrendTier::Moderate);
        assert_eq!(TrendTier::from_score(60.0), TrendTier::Strong);
        assert_eq!(TrendTier::from_score(80.0), TrendTier::VeryStrong);
    }

    #[test]
    fn test_trend_strength_clamped() {
        assert_eq!(TrendStrength::new(140.0).score, 100.0);
        assert_eq!(TrendStrength::new(-3.0).score, 0.0);
    }

    #[test]
    fn test_degenerate_bands() {
        let bands = BollingerReading {
            upper: 10.0,
            middle: 10.0,
            lower: 10.0,
        };
        assert!(bands.is_degenerate());
        assert_eq!(bands.width_ratio(), 0.0);
    }

    #[test]
    fn test_ichimoku_cross() {
        let reading = IchimokuReading {
            tenkan: 101.0,
            kijun: 100.0,
            prev_tenkan: 99.0,
            prev_kijun: 100.0,
        };
        assert!(reading.bullish_cross());
        assert!(!reading.bearish_cross());
    }
}
