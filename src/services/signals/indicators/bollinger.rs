//! Bollinger Bands indicator.

use crate::services::signals::{mean, std_dev, tail, Indicator};
use crate::types::BollingerReading;

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// Uses the population standard deviation. Short series collapse all three
/// bands onto the last price.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period: period.max(1),
            std_dev_multiplier,
        }
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerReading;

    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn fallback(&self, prices: &[f64]) -> BollingerReading {
        let last = prices.last().copied().unwrap_or(0.0);
        BollingerReading {
            upper: last,
            middle: last,
            lower: last,
        }
    }

    fn compute(&self, prices: &[f64]) -> BollingerReading {
        let window = tail(prices, self.period);
        let middle = mean(window);
        let deviation = std_dev(window, middle);

        BollingerReading {
            upper: middle + self.std_dev_multiplier * deviation,
            middle,
            lower: middle - self.std_dev_multiplier * deviation,
        }
    }
}

/// Shorthand for Bollinger Bands over `period` with `k` deviations.
pub fn bollinger_bands(prices: &[f64], period: usize, k: f64) -> BollingerReading {
    BollingerBands::new(period, k).calculate(prices)
}
