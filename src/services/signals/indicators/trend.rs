//! Trend strength scoring.

use crate::services::signals::indicators::{rsi::rsi, sma::sma};
use crate::services::signals::{mean, tail};
use crate::types::TrendStrength;

/// Number of recent moves inspected for directional consistency.
pub const CONSISTENCY_WINDOW: usize = 14;

const SHORT_MA: usize = 10;
const LONG_MA: usize = 30;

/// Score how strongly the series is trending (0-100).
///
/// Components:
/// - % gap between SMA(10) and SMA(30), up to 35 points
/// - RSI deviation from 50, up to 25 points
/// - share of the last 14 moves pointing the same way, up to 30 points
/// - recent volume above its 20-sample average while moves are consistent,
///   up to 10 points
///
/// Series shorter than 15 samples score 0.
pub fn trend_strength(prices: &[f64], volumes: &[f64]) -> TrendStrength {
    if prices.len() < CONSISTENCY_WINDOW + 1 {
        return TrendStrength::new(0.0);
    }

    let short = sma(prices, SHORT_MA);
    let long = sma(prices, LONG_MA);
    let ma_gap_pct = if long.abs() > f64::EPSILON {
        ((short - long) / long).abs() * 100.0
    } else {
        0.0
    };
    let ma_component = (ma_gap_pct * 15.0).min(35.0);

    let rsi_component = ((rsi(prices, 14) - 50.0).abs() * 0.8).min(25.0);

    let consistency = move_consistency(prices);
    // A coin flip lands near 0.5; only the excess counts.
    let consistency_component = ((consistency - 0.5).max(0.0) * 2.0 * 30.0).min(30.0);

    let volume_component = if consistency > 0.5 {
        volume_confirmation(volumes)
    } else {
        0.0
    };

    TrendStrength::new(ma_component + rsi_component + consistency_component + volume_component)
}

/// Fraction (0-1) of the last [`CONSISTENCY_WINDOW`] moves in the dominant direction.
pub fn move_consistency(prices: &[f64]) -> f64 {
    let window = tail(prices, CONSISTENCY_WINDOW + 1);
    if window.len() < 2 {
        return 0.0;
    }
    let (ups, downs) = window.windows(2).fold((0usize, 0usize), |(up, down), w| {
        if w[1] > w[0] {
            (up + 1, down)
        } else if w[1] < w[0] {
            (up, down + 1)
        } else {
            (up, down)
        }
    });
    ups.max(downs) as f64 / (window.len() - 1) as f64
}

/// Up to 10 points when the last 5 volumes exceed the 20-sample average.
pub fn volume_confirmation(volumes: &[f64]) -> f64 {
    if volumes.len() < 20 {
        return 0.0;
    }
    let baseline = mean(tail(volumes, 20));
    if baseline <= f64::EPSILON {
        return 0.0;
    }
    let ratio = mean(tail(volumes, 5)) / baseline;
    ((ratio - 1.0) * 20.0).clamp(0.0, 10.0)
}
