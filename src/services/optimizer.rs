//! Outcome-driven optimizer.
//!
//! Fixed heuristics over past win/loss records. Once enough history exists
//! for a symbol, a profile nudges confidence and timing of new signals.

use crate::types::{
    ConfluenceResult, MarketCondition, OptimizationProfile, OutcomeRecord, Timeframe,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Appended to a signal's indicator list once a profile has been applied.
pub const OPTIMIZATION_MARKER: &str = "AI Optimization";

const RECOMMENDED_TIMEFRAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Records needed for a symbol before any profile is produced.
    pub min_sample_size: usize,
    /// Completed records needed before a timeframe can be recommended.
    pub min_timeframe_samples: usize,
    pub volatility_threshold: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 10,
            min_timeframe_samples: 5,
            volatility_threshold: 0.015,
        }
    }
}

fn win_rate<'a>(records: impl IntoIterator<Item = &'a OutcomeRecord>) -> (f64, usize) {
    let (wins, total) = records
        .into_iter()
        .filter(|r| r.is_completed())
        .fold((0usize, 0usize), |(wins, total), r| {
            (wins + usize::from(r.is_win()), total + 1)
        });
    if total == 0 {
        (0.0, 0)
    } else {
        (wins as f64 / total as f64 * 100.0, total)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Build a profile for `symbol`, or `None` while history is too thin.
    pub fn optimize(
        &self,
        symbol: &str,
        records: &[OutcomeRecord],
        now: DateTime<Utc>,
    ) -> Option<OptimizationProfile> {
        let symbol = symbol.to_uppercase();
        let relevant: Vec<&OutcomeRecord> = records
            .iter()
            .filter(|r| r.symbol.eq_ignore_ascii_case(&symbol))
            .collect();

        if relevant.len() < self.config.min_sample_size {
            debug!(
                "Not enough history for {} ({} of {} records)",
                symbol,
                relevant.len(),
                self.config.min_sample_size
            );
            return None;
        }

        let (win_rate_pct, _) = win_rate(relevant.iter().copied());

        let mut by_timeframe: HashMap<Timeframe, Vec<&OutcomeRecord>> = HashMap::new();
        for record in relevant.iter().filter(|r| r.is_completed()) {
            by_timeframe.entry(record.timeframe).or_default().push(*record);
        }
        let mut ranked: Vec<(Timeframe, f64)> = by_timeframe
            .into_iter()
            .filter(|(_, records)| records.len() >= self.config.min_timeframe_samples)
            .map(|(timeframe, records)| (timeframe, win_rate(records).0))
            .collect();
        // Shorter timeframe first on equal win rates.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let confidence_adjustment = if win_rate_pct >= 65.0 {
            5.0
        } else if win_rate_pct >= 50.0 {
            0.0
        } else {
            -5.0
        };

        let profile = OptimizationProfile {
            symbol,
            win_rate: win_rate_pct,
            sample_size: relevant.len() as u32,
            confidence_adjustment,
            recommended_timeframes: ranked
                .into_iter()
                .take(RECOMMENDED_TIMEFRAMES)
                .map(|(timeframe, _)| timeframe)
                .collect(),
            volatility_threshold: self.config.volatility_threshold,
            entry_timing_adjustment: if win_rate_pct < 60.0 { 2 } else { 0 },
            expiry_minutes_adjustment: if win_rate_pct >= 65.0 { 1 } else { 0 },
            preferred_conditions: vec![
                MarketCondition::StrongTrendUp,
                MarketCondition::TrendUp,
                MarketCondition::TrendDown,
                MarketCondition::StrongTrendDown,
            ],
            avoided_conditions: vec![MarketCondition::Volatile],
            last_updated: now,
        };

        debug!(
            "Optimization profile for {}: {:.1}% over {} records, confidence {:+}",
            profile.symbol, profile.win_rate, profile.sample_size, profile.confidence_adjustment
        );
        Some(profile)
    }

    /// Bias `result` with `profile`. A result that already carries
    /// [`OPTIMIZATION_MARKER`] comes back unchanged.
    pub fn apply(
        &self,
        result: &ConfluenceResult,
        profile: &OptimizationProfile,
        now: DateTime<Utc>,
    ) -> ConfluenceResult {
        let mut result = result.clone();
        let signal = &mut result.primary_signal;
        if signal.indicators.iter().any(|name| name == OPTIMIZATION_MARKER) {
            return result;
        }

        signal.confidence = (signal.confidence + profile.confidence_adjustment).clamp(60.0, 96.0);

        // Entry and expiry move together, and only with a timing shift.
        if profile.entry_timing_adjustment != 0 {
            let countdown = signal.countdown_seconds + profile.entry_timing_adjustment;
            let expiry_minutes =
                (i64::from(signal.expiry_minutes) + profile.expiry_minutes_adjustment).max(1);

            signal.countdown_seconds = countdown;
            signal.entry_time = now + Duration::seconds(countdown);
            signal.expiry_minutes = expiry_minutes as u32;
            signal.expiry_time = signal.entry_time + Duration::minutes(expiry_minutes);
            result.countdown_seconds = countdown;
        }

        result.primary_signal.indicators.push(OPTIMIZATION_MARKER.to_string());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, SignalResult};

    fn records(
        symbol: &str,
        timeframe: Timeframe,
        wins: usize,
        losses: usize,
    ) -> Vec<OutcomeRecord> {
        let win = OutcomeRecord::new(symbol, timeframe, Direction::Call, 70.0)
            .with_result(SignalResult::Win);
        let loss = OutcomeRecord::new(symbol, timeframe, Direction::Put, 70.0)
            .with_result(SignalResult::Loss);
        std::iter::repeat(win)
            .take(wins)
            .chain(std::iter::repeat(loss).take(losses))
            .collect()
    }

    fn base_result(now: DateTime<Utc>) -> ConfluenceResult {
        crate::services::signals::store::neutral_result("BTCUSD", Timeframe::FiveMinutes, now)
    }

    fn profile(timing: i64, expiry: i64) -> OptimizationProfile {
        let history = records("BTCUSD", Timeframe::FiveMinutes, 8, 4);
        let mut profile = Optimizer::default()
            .optimize("BTCUSD", &history, Utc::now())
            .unwrap();
        profile.entry_timing_adjustment = timing;
        profile.expiry_minutes_adjustment = expiry;
        profile
    }

    #[test]
    fn test_apply_without_timing_shift_keeps_schedule() {
        let now = Utc::now();
        let base = base_result(now);
        let applied = Optimizer::default().apply(&base, &profile(0, 1), now + Duration::seconds(30));

        let (before, after) = (&base.primary_signal, &applied.primary_signal);
        assert_eq!(after.expiry_minutes, before.expiry_minutes);
        assert_eq!(after.entry_time, before.entry_time);
        assert_eq!(after.expiry_time, before.expiry_time);
        assert_eq!(applied.countdown_seconds, base.countdown_seconds);
        assert_eq!(after.indicators, vec![OPTIMIZATION_MARKER.to_string()]);
    }

    #[test]
    fn test_apply_timing_shift_carries_expiry_adjustment() {
        let now = Utc::now();
        let applied = Optimizer::default().apply(&base_result(now), &profile(2, 1), now);
        let signal = &applied.primary_signal;

        assert_eq!(signal.countdown_seconds, 2);
        assert_eq!(applied.countdown_seconds, 2);
        assert_eq!(signal.entry_time, now + Duration::seconds(2));
        assert_eq!(signal.expiry_minutes, 6);
        assert_eq!(signal.expiry_time, signal.entry_time + Duration::minutes(6));
    }

    #[test]
    fn test_too_few_records() {
        let history = records("BTCUSD", Timeframe::FiveMinutes, 3, 1);
        assert!(Optimizer::default().optimize("BTCUSD", &history, Utc::now()).is_none());
    }

    #[test]
    fn test_other_symbols_ignored() {
        let mut history = records("BTCUSD", Timeframe::FiveMinutes, 3, 1);
        history.extend(records("ETHUSD", Timeframe::FiveMinutes, 20, 0));
        assert!(Optimizer::default().optimize("btcusd", &history, Utc::now()).is_none());
    }

    #[test]
    fn test_strong_history() {
        let mut history = records("BTCUSD", Timeframe::FiveMinutes, 8, 2);
        history.extend(records("BTCUSD", Timeframe::OneMinute, 3, 2));
        history.extend(records("BTCUSD", Timeframe::OneHour, 2, 1));

        let profile = Optimizer::default()
            .optimize("BTCUSD", &history, Utc::now())
            .unwrap();
        assert_eq!(profile.sample_size, 18);
        // 13 of 18
        assert!((profile.win_rate - 72.2222).abs() < 1e-3);
        assert_eq!(profile.confidence_adjustment, 5.0);
        assert_eq!(profile.entry_timing_adjustment, 0);
        assert_eq!(profile.expiry_minutes_adjustment, 1);
        // 1h has only 3 samples
        assert_eq!(
            profile.recommended_timeframes,
            vec![Timeframe::FiveMinutes, Timeframe::OneMinute]
        );
        assert_eq!(profile.avoided_conditions, vec![MarketCondition::Volatile]);
    }

    #[test]
    fn test_weak_history() {
        let history = records("BTCUSD", Timeframe::FiveMinutes, 4, 8);
        let profile = Optimizer::default()
            .optimize("BTCUSD", &history, Utc::now())
            .unwrap();
        assert_eq!(profile.confidence_adjustment, -5.0);
        assert_eq!(profile.entry_timing_adjustment, 2);
        assert_eq!(profile.expiry_minutes_adjustment, 0);
    }

    #[test]
    fn test_pending_records_count_toward_minimum_only() {
        let mut history = records("BTCUSD", Timeframe::FiveMinutes, 3, 3);
        for _ in 0..4 {
            history.push(OutcomeRecord::new(
                "BTCUSD",
                Timeframe::FiveMinutes,
                Direction::Call,
                60.0,
            ));
        }
        let profile = Optimizer::default()
            .optimize("BTCUSD", &history, Utc::now())
            .unwrap();
        assert_eq!(profile.sample_size, 10);
        assert_eq!(profile.win_rate, 50.0);
        assert_eq!(profile.confidence_adjustment, 0.0);
    }
}
