//! Trading signals service module.
//!
//! Provides technical indicator calculations, per-timeframe signal
//! derivation, multi-timeframe confluence aggregation and the cached
//! signal store that ties them together.

pub mod analyzer;
pub mod confluence;
pub mod indicators;
pub mod store;
pub mod timing;

pub use analyzer::TimeframeAnalyzer;
pub use confluence::{ConfluenceAggregator, VoteTally};
pub use store::SignalStore;

/// Trait for implementing technical indicators over a price series.
///
/// Indicators never fail: when the series is shorter than
/// [`Indicator::min_periods`] a defined neutral fallback is returned.
pub trait Indicator {
    type Output;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Minimum number of samples required for a real calculation.
    fn min_periods(&self) -> usize;

    /// Value returned when there is not enough data.
    fn fallback(&self, prices: &[f64]) -> Self::Output;

    /// Calculation over a series of at least `min_periods` samples.
    fn compute(&self, prices: &[f64]) -> Self::Output;

    /// Calculate, falling back on insufficient input.
    fn calculate(&self, prices: &[f64]) -> Self::Output {
        if prices.len() < self.min_periods() {
            self.fallback(prices)
        } else {
            self.compute(prices)
        }
    }
}

/// Arithmetic mean (0 for an empty slice).
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around `mean`.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance: f64 =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// The trailing `n` samples (or all of them).
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Relative distance between two prices, as a fraction of `reference`.
pub fn relative_distance(price: f64, reference: f64) -> f64 {
    if reference.abs() <= f64::EPSILON {
        return f64::INFINITY;
    }
    ((price - reference) / reference).abs()
}
