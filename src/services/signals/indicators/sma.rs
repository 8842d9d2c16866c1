//! Simple Moving Average (SMA) indicator.

use crate::services::signals::{mean, tail, Indicator};

/// SMA (Simple Moving Average) indicator.
///
/// Average of the trailing `period` samples. With fewer samples the
/// average of everything available is used.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn name(&self) -> &str {
        "SMA"
    }

    fn min_periods(&self) -> usize {
        self.period.max(1)
    }

    fn fallback(&self, prices: &[f64]) -> f64 {
        mean(prices)
    }

    fn compute(&self, prices: &[f64]) -> f64 {
        mean(tail(prices, self.period))
    }
}

/// Shorthand for [`Sma::calculate`].
pub fn sma(prices: &[f64], period: usize) -> f64 {
    Sma::new(period).calculate(prices)
}
