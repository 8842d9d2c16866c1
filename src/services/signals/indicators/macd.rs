//! MACD (Moving Average Convergence Divergence) indicator.

use crate::services::signals::indicators::ema::ema_series;
use crate::services::signals::Indicator;
use crate::types::MacdReading;
use serde::{Deserialize, Serialize};

/// Signal line as a fixed fraction of the MACD line.
pub const MACD_SIGNAL_RATIO: f64 = 0.85;

/// How the signal line is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalLineMode {
    /// `line × MACD_SIGNAL_RATIO`. Cheap and what the rest of the pipeline
    /// is calibrated against.
    #[default]
    Approximate,
    /// EMA of the MACD line over the signal period.
    Ema,
}

impl SignalLineMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approx" | "approximate" => Some(Self::Approximate),
            "ema" => Some(Self::Ema),
            _ => None,
        }
    }
}

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = see [`SignalLineMode`]
/// - Histogram = MACD Line - Signal Line
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    mode: SignalLineMode,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            mode: SignalLineMode::Approximate,
        }
    }
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period: fast_period.max(1),
            slow_period: slow_period.max(fast_period.max(1)),
            signal_period: signal_period.max(1),
            mode: SignalLineMode::Approximate,
        }
    }

    pub fn with_mode(mut self, mode: SignalLineMode) -> Self {
        self.mode = mode;
        self
    }

    /// MACD line values aligned to the slow EMA.
    fn line_series(&self, prices: &[f64]) -> Vec<f64> {
        let fast_ema = ema_series(prices, self.fast_period);
        let slow_ema = ema_series(prices, self.slow_period);

        // Align the EMAs (fast starts earlier)
        let offset = self.slow_period - self.fast_period;
        fast_ema
            .iter()
            .skip(offset)
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect()
    }
}

impl Indicator for Macd {
    type Output = MacdReading;

    fn name(&self) -> &str {
        "MACD"
    }

    fn min_periods(&self) -> usize {
        self.slow_period
    }

    fn fallback(&self, _prices: &[f64]) -> MacdReading {
        MacdReading::default()
    }

    fn compute(&self, prices: &[f64]) -> MacdReading {
        let macd_line = self.line_series(prices);
        let Some(&line) = macd_line.last() else {
            return MacdReading::default();
        };

        let signal = match self.mode {
            SignalLineMode::Approximate => line * MACD_SIGNAL_RATIO,
            SignalLineMode::Ema => ema_series(&macd_line, self.signal_period)
                .last()
                .copied()
                .unwrap_or(line * MACD_SIGNAL_RATIO),
        };

        MacdReading {
            line,
            signal,
            histogram: line - signal,
        }
    }
}

/// Shorthand for the default MACD(12, 26, 9).
pub fn macd(prices: &[f64]) -> MacdReading {
    Macd::default().calculate(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend(count: usize) -> Vec<f64> {
        (0..count).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn test_macd_insufficient_data() {
        assert_eq!(macd(&uptrend(20)), MacdReading::default());
    }

    #[test]
    fn test_macd_uptrend_positive() {
        let reading = macd(&uptrend(80));
        assert!(reading.line > 0.0);
        assert!(reading.histogram > 0.0);
        assert!(reading.is_bullish());
    }

    #[test]
    fn test_macd_signal_approximation() {
        let reading = macd(&uptrend(80));
        assert!((reading.signal - reading.line * MACD_SIGNAL_RATIO).abs() < 1e-12);
        assert!((reading.histogram - (reading.line - reading.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_ema_signal_line() {
        let prices: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 / 6.0).sin() * 4.0)
            .collect();
        let approx = Macd::default().calculate(&prices);
        let ema = Macd::default().with_mode(SignalLineMode::Ema).calculate(&prices);
        assert_eq!(approx.line, ema.line);
        assert!((ema.histogram - (ema.line - ema.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_signal_line_mode_from_str() {
        assert_eq!(SignalLineMode::from_str("approx"), Some(SignalLineMode::Approximate));
        assert_eq!(SignalLineMode::from_str("EMA"), Some(SignalLineMode::Ema));
        assert_eq!(SignalLineMode::from_str("sma"), None);
    }
}
