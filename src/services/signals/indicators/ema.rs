//! Exponential Moving Average (EMA) indicator.

use crate::services::signals::{mean, Indicator};

/// EMA (Exponential Moving Average) indicator.
///
/// Like SMA but gives more weight to recent prices. Seeded with the SMA of
/// the first `period` samples.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn name(&self) -> &str {
        "EMA"
    }

    fn min_periods(&self) -> usize {
        self.period.max(1)
    }

    fn fallback(&self, prices: &[f64]) -> f64 {
        mean(prices)
    }

    fn compute(&self, prices: &[f64]) -> f64 {
        ema_series(prices, self.period)
            .last()
            .copied()
            .unwrap_or_else(|| mean(prices))
    }
}

/// EMA values from the seed sample onward.
///
/// The result has `values.len() - period + 1` entries, or none when the
/// input is shorter than `period`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = Vec::with_capacity(values.len() - period + 1);

    // First EMA is SMA
    let mut current = mean(&values[..period]);
    ema.push(current);

    for value in &values[period..] {
        current = (value - current) * multiplier + current;
        ema.push(current);
    }

    ema
}

/// Shorthand for [`Ema::calculate`].
pub fn ema(prices: &[f64], period: usize) -> f64 {
    Ema::new(period).calculate(prices)
}
