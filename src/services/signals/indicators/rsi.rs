//! Relative Strength Index (RSI) indicator.

use crate::services::signals::Indicator;

/// Neutral RSI returned when there is not enough data.
pub const NEUTRAL_RSI: f64 = 50.0;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses,
/// using Wilder's smoothing. Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
///
/// Series of `period` samples or fewer return 50.
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period: period.max(1) }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn name(&self) -> &str {
        "RSI"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn fallback(&self, _prices: &[f64]) -> f64 {
        NEUTRAL_RSI
    }

    fn compute(&self, prices: &[f64]) -> f64 {
        let period = self.period;
        let (gains, losses): (Vec<f64>, Vec<f64>) = prices
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                if change > 0.0 {
                    (change, 0.0)
                } else {
                    (0.0, -change)
                }
            })
            .unzip();

        // Calculate initial averages
        let mut avg_gain: f64 = gains.iter().take(period).sum::<f64>() / period as f64;
        let mut avg_loss: f64 = losses.iter().take(period).sum::<f64>() / period as f64;

        // Use smoothed averages for remaining data
        for i in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        }

        if avg_loss == 0.0 {
            // A window with no movement at all is neutral, not overbought.
            return if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 };
        }

        let rs = avg_gain / avg_loss;
        (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
    }
}

/// Shorthand for [`Rsi::calculate`].
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    Rsi::new(period).calculate(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 + i as f64 * 1.5 + if i % 3 == 0 { -1.0 } else { 0.0 })
            .collect()
    }

    fn downtrend(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 200.0 - i as f64 * 1.5 + if i % 3 == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_rsi_min_periods() {
        let rsi = Rsi::default();
        assert_eq!(rsi.min_periods(), 15);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert_eq!(rsi(&uptrend(10), 14), 50.0);
        // Exactly `period` samples is still insufficient
        assert_eq!(rsi(&uptrend(14), 14), 50.0);
        assert_eq!(rsi(&[], 14), 50.0);
    }

    #[test]
    fn test_rsi_uptrend_high_value() {
        let value = rsi(&uptrend(50), 14);
        assert!(value > 50.0, "RSI in uptrend should be > 50, got {}", value);
    }

    #[test]
    fn test_rsi_downtrend_low_value() {
        let value = rsi(&downtrend(50), 14);
        assert!(value < 50.0, "RSI in downtrend should be < 50, got {}", value);
    }

    #[test]
    fn test_rsi_flat_series_is_neutral() {
        assert_eq!(rsi(&vec![100.0; 60], 14), 50.0);
    }

    #[test]
    fn test_rsi_only_gains() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&prices, 14), 100.0);
    }

    #[test]
    fn test_rsi_value_range() {
        let jagged: Vec<f64> = (0..120)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0)
            .collect();
        for period in [2, 7, 14, 18] {
            let value = rsi(&jagged, period);
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
