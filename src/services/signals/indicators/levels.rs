//! Price levels: support/resistance pivots, Fibonacci retracements and
//! Ichimoku conversion/base lines.

use crate::services::signals::{relative_distance, tail};
use crate::types::{FibonacciLevels, IchimokuReading, SupportResistance};

/// Pivots within this fraction of a level count as a touch.
const TOUCH_TOLERANCE: f64 = 0.005;

/// Retracement ratios, ascending.
pub const FIBONACCI_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

const TENKAN_PERIOD: usize = 9;
const KIJUN_PERIOD: usize = 26;

/// Nearest pivot support below and pivot resistance above the last price.
///
/// A pivot low is a sample no higher than the two samples on either side
/// (pivot highs mirror that). Without a qualifying pivot the window's
/// minimum/maximum is used.
pub fn support_resistance(prices: &[f64], lookback: usize) -> SupportResistance {
    let window = tail(prices, lookback);
    let Some(&price) = window.last() else {
        return SupportResistance {
            support: 0.0,
            resistance: 0.0,
            support_touches: 0,
            resistance_touches: 0,
        };
    };

    let mut lows = Vec::new();
    let mut highs = Vec::new();
    if window.len() >= 5 {
        for i in 2..window.len() - 2 {
            let neighbours = [window[i - 2], window[i - 1], window[i + 1], window[i + 2]];
            if neighbours.iter().all(|n| window[i] <= *n) {
                lows.push(window[i]);
            }
            if neighbours.iter().all(|n| window[i] >= *n) {
                highs.push(window[i]);
            }
        }
    }

    let window_min = window.iter().copied().fold(f64::INFINITY, f64::min);
    let window_max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let support = lows
        .iter()
        .copied()
        .filter(|low| *low <= price)
        .fold(None, |best: Option<f64>, low| Some(best.map_or(low, |b| b.max(low))))
        .unwrap_or(window_min);
    let resistance = highs
        .iter()
        .copied()
        .filter(|high| *high >= price)
        .fold(None, |best: Option<f64>, high| Some(best.map_or(high, |b| b.min(high))))
        .unwrap_or(window_max);

    let touches = |pivots: &[f64], level: f64| {
        pivots
            .iter()
            .filter(|p| relative_distance(**p, level) <= TOUCH_TOLERANCE)
            .count() as u32
    };

    SupportResistance {
        support,
        resistance,
        support_touches: touches(&lows, support),
        resistance_touches: touches(&highs, resistance),
    }
}

/// Retracement levels of the swing over the trailing `lookback` samples.
pub fn fibonacci_levels(prices: &[f64], lookback: usize) -> FibonacciLevels {
    let window = tail(prices, lookback);
    let swing_high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let swing_low = window.iter().copied().fold(f64::INFINITY, f64::min);

    if window.is_empty() {
        return FibonacciLevels {
            swing_high: 0.0,
            swing_low: 0.0,
            levels: Vec::new(),
        };
    }

    let range = swing_high - swing_low;
    FibonacciLevels {
        swing_high,
        swing_low,
        levels: FIBONACCI_RATIOS
            .iter()
            .map(|ratio| (*ratio, swing_high - range * ratio))
            .collect(),
    }
}

fn midpoint(values: &[f64]) -> f64 {
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    (high + low) / 2.0
}

/// Tenkan-sen (9) and Kijun-sen (26) over closes, now and one sample back.
///
/// With fewer than 27 samples every line sits on the last price, so no cross
/// is ever reported.
pub fn ichimoku(prices: &[f64]) -> IchimokuReading {
    if prices.len() < KIJUN_PERIOD + 1 {
        let last = prices.last().copied().unwrap_or(0.0);
        return IchimokuReading {
            tenkan: last,
            kijun: last,
            prev_tenkan: last,
            prev_kijun: last,
        };
    }

    let previous = &prices[..prices.len() - 1];
    IchimokuReading {
        tenkan: midpoint(tail(prices, TENKAN_PERIOD)),
        kijun: midpoint(tail(prices, KIJUN_PERIOD)),
        prev_tenkan: midpoint(tail(previous, TENKAN_PERIOD)),
        prev_kijun: midpoint(tail(previous, KIJUN_PERIOD)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_resistance_pivots() {
        // Valley at 95, peak at 110, last price 100.
        let prices = vec![
            100.0, 98.0, 96.0, 95.0, 97.0, 99.0, 104.0, 108.0, 110.0, 107.0, 104.0, 102.0, 100.0,
        ];
        let levels = support_resistance(&prices, 50);
        assert_eq!(levels.support, 95.0);
        assert_eq!(levels.resistance, 110.0);
        assert_eq!(levels.support_touches, 1);
        assert_eq!(levels.resistance_touches, 1);
    }

    #[test]
    fn test_support_resistance_flat() {
        let levels = support_resistance(&vec![100.0; 60], 50);
        assert_eq!(levels.support, 100.0);
        assert_eq!(levels.resistance, 100.0);
    }

    #[test]
    fn test_support_resistance_empty() {
        let levels = support_resistance(&[], 50);
        assert_eq!(levels.support, 0.0);
        assert_eq!(levels.support_touches, 0);
    }

    #[test]
    fn test_fibonacci_levels() {
        let prices = vec![100.0, 150.0, 200.0];
        let fib = fibonacci_levels(&prices, 50);
        assert_eq!(fib.swing_high, 200.0);
        assert_eq!(fib.swing_low, 100.0);
        assert_eq!(fib.levels.len(), 5);
        assert!((fib.levels[2].1 - 150.0).abs() < 1e-9);
        assert!(fib.nearest_distance(150.0).unwrap() < 1e-9);
    }

    #[test]
    fn test_ichimoku_short_series() {
        let reading = ichimoku(&[1.0, 2.0, 3.0]);
        assert_eq!(reading.tenkan, 3.0);
        assert!(!reading.bullish_cross());
        assert!(!reading.bearish_cross());
    }

    #[test]
    fn test_ichimoku_rising_series() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let reading = ichimoku(&prices);
        // Shorter window tracks the rise more closely
        assert!(reading.tenkan > reading.kijun);
    }
}
