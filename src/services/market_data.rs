//! Market data providers.
//!
//! The analyzer only ever sees two equal-length sequences (prices and
//! volumes). Where they come from is behind [`MarketDataProvider`].

use crate::error::{AppError, Result};
use crate::types::{MarketSeries, Timeframe};
use dashmap::DashMap;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Source of price/volume series.
pub trait MarketDataProvider: Send + Sync {
    /// The most recent `len` samples for `symbol` at `timeframe`, oldest first.
    fn series(&self, symbol: &str, timeframe: Timeframe, len: usize) -> Result<MarketSeries>;
}

/// Deterministic per-symbol parameters of the synthetic walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolProfile {
    pub base_price: f64,
    /// Per-sample return volatility at the 1-minute timeframe.
    pub volatility: f64,
    /// Raw hash prefix, mixed into the RNG seed.
    pub fingerprint: u64,
}

impl SymbolProfile {
    pub fn for_symbol(symbol: &str) -> Self {
        let digest = Sha256::digest(symbol.trim().to_uppercase().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let fingerprint = u64::from_be_bytes(prefix);

        Self {
            base_price: 1.0 + (fingerprint % 100_000) as f64 / 10.0,
            volatility: 0.002 + ((fingerprint >> 20) % 80) as f64 / 10_000.0,
            fingerprint,
        }
    }
}

/// Random-walk stand-in for a real market feed.
///
/// Base price and volatility come from a SHA-256 hash of the symbol. The walk
/// carries a drift that changes every 20-40 samples. With a seed the output
/// is fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct SyntheticMarketData {
    seed: Option<u64>,
}

impl SyntheticMarketData {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self, profile: &SymbolProfile, timeframe: Timeframe) -> StdRng {
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        StdRng::seed_from_u64(seed ^ profile.fingerprint ^ u64::from(timeframe.minutes()))
    }

    /// Generate a walk of `len` samples.
    pub fn generate(&self, symbol: &str, timeframe: Timeframe, len: usize) -> MarketSeries {
        let profile = SymbolProfile::for_symbol(symbol);
        let mut rng = self.rng(&profile, timeframe);

        // Longer bars move more, up to a point.
        let step_volatility = profile.volatility * f64::from(timeframe.minutes()).sqrt().min(6.0);

        let mut prices = Vec::with_capacity(len);
        let mut volumes = Vec::with_capacity(len);
        let mut price = profile.base_price;
        let mut drift = 0.0;
        let mut until_shift = 0usize;

        for _ in 0..len {
            if until_shift == 0 {
                drift = rng.gen_range(-1.0..1.0) * step_volatility * 0.3;
                until_shift = rng.gen_range(20..=40);
            }
            until_shift -= 1;

            let step = drift + step_volatility * rng.gen_range(-1.0..1.0);
            price = (price * (1.0 + step)).max(0.0001);

            let activity = 1.0 + (step.abs() / step_volatility.max(f64::EPSILON)) * 0.5;
            volumes.push(price * 1_000.0 * activity * rng.gen_range(0.7..1.3));
            prices.push(price);
        }

        MarketSeries { prices, volumes }
    }
}

impl MarketDataProvider for SyntheticMarketData {
    fn series(&self, symbol: &str, timeframe: Timeframe, len: usize) -> Result<MarketSeries> {
        if symbol.trim().is_empty() {
            return Err(AppError::DataProvider("empty symbol".to_string()));
        }
        debug!("Generating {} synthetic samples for {} at {}", len, symbol, timeframe);
        Ok(self.generate(symbol, timeframe, len))
    }
}

/// Replays fixed series keyed by symbol. The timeframe is ignored.
#[derive(Debug, Default)]
pub struct StaticMarketData {
    series: DashMap<String, MarketSeries>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, symbol: &str, series: MarketSeries) {
        self.series.insert(symbol.trim().to_uppercase(), series);
    }

    pub fn with_series(self, symbol: &str, series: MarketSeries) -> Self {
        self.insert(symbol, series);
        self
    }
}

impl MarketDataProvider for StaticMarketData {
    fn series(&self, symbol: &str, _timeframe: Timeframe, len: usize) -> Result<MarketSeries> {
        let key = symbol.trim().to_uppercase();
        let stored = self
            .series
            .get(&key)
            .ok_or_else(|| AppError::DataProvider(format!("no series for {}", key)))?;

        let start = stored.len().saturating_sub(len);
        MarketSeries::new(stored.prices[start..].to_vec(), stored.volumes[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_is_deterministic() {
        let a = SymbolProfile::for_symbol("btcusd");
        let b = SymbolProfile::for_symbol("BTCUSD");
        assert_eq!(a, b);
        assert!(a.base_price >= 1.0);
        assert!(a.volatility >= 0.002 && a.volatility < 0.01);
    }

    #[test]
    fn test_seeded_series_repeat() {
        let provider = SyntheticMarketData::seeded(7);
        let a = provider.series("ETHUSD", Timeframe::FiveMinutes, 200).unwrap();
        let b = provider.series("ETHUSD", Timeframe::FiveMinutes, 200).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.prices.len(), 200);
        assert_eq!(a.volumes.len(), 200);
        assert!(a.prices.iter().all(|p| *p > 0.0));
        assert!(a.volumes.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_symbols_differ() {
        let provider = SyntheticMarketData::seeded(7);
        let a = provider.generate("ETHUSD", Timeframe::OneMinute, 50);
        let b = provider.generate("SOLUSD", Timeframe::OneMinute, 50);
        assert_ne!(a.prices, b.prices);
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let provider = SyntheticMarketData::new();
        assert!(provider.series("  ", Timeframe::OneMinute, 10).is_err());
    }

    #[test]
    fn test_static_tail_and_missing() {
        let provider = StaticMarketData::new().with_series(
            "abc",
            MarketSeries::new(vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]).unwrap(),
        );
        let series = provider.series("ABC", Timeframe::OneHour, 2).unwrap();
        assert_eq!(series.prices, vec![2.0, 3.0]);
        assert_eq!(series.volumes, vec![20.0, 30.0]);

        let all = provider.series("ABC", Timeframe::OneHour, 100).unwrap();
        assert_eq!(all.len(), 3);

        assert!(matches!(
            provider.series("XYZ", Timeframe::OneHour, 2),
            Err(AppError::DataProvider(_))
        ));
    }
}
