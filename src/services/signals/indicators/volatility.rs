//! Return volatility.

use crate::services::signals::{mean, std_dev, tail, Indicator};

/// Population standard deviation of simple returns over the trailing window.
///
/// Expressed as a ratio (0.015 = 1.5 %), so thresholds are comparable across
/// symbols with very different price levels.
pub struct Volatility {
    period: usize,
}

impl Default for Volatility {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Volatility {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Volatility {
    type Output = f64;

    fn name(&self) -> &str {
        "Volatility"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn fallback(&self, _prices: &[f64]) -> f64 {
        0.0
    }

    fn compute(&self, prices: &[f64]) -> f64 {
        let window = tail(prices, self.period + 1);
        let returns: Vec<f64> = window
            .windows(2)
            .filter(|w| w[0].abs() > f64::EPSILON)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();

        std_dev(&returns, mean(&returns))
    }
}

/// Shorthand for [`Volatility::calculate`].
pub fn volatility(prices: &[f64], period: usize) -> f64 {
    Volatility::new(period).calculate(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_flat_series() {
        assert_eq!(volatility(&vec![50.0; 100], 14), 0.0);
    }

    #[test]
    fn test_volatility_insufficient_data() {
        assert_eq!(volatility(&[1.0, 2.0, 3.0], 14), 0.0);
    }

    #[test]
    fn test_volatility_constant_growth_is_zero() {
        // Identical returns have no dispersion.
        let prices: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        assert!(volatility(&prices, 14) < 1e-12);
    }

    #[test]
    fn test_volatility_alternating() {
        let prices: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        let value = volatility(&prices, 14);
        assert!(value > 0.015 && value < 0.025, "got {}", value);
    }
}
