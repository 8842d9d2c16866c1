//! Entry and expiry timing.

use crate::types::Timeframe;
use chrono::{DateTime, Duration, Timelike, Utc};

/// Entries never land in the closing seconds of a minute.
pub const MIN_ENTRY_LEAD_SECONDS: i64 = 3;

const MINUTE_MILLIS: i64 = 60_000;

/// Milliseconds until the next whole minute, pushed out one more minute
/// when less than [`MIN_ENTRY_LEAD_SECONDS`] would remain.
pub fn entry_offset_millis(now: DateTime<Utc>) -> i64 {
    let into_minute =
        i64::from(now.second()) * 1_000 + i64::from(now.nanosecond() % 1_000_000_000) / 1_000_000;
    let offset = MINUTE_MILLIS - into_minute;
    if offset < MIN_ENTRY_LEAD_SECONDS * 1_000 {
        offset + MINUTE_MILLIS
    } else {
        offset
    }
}

/// Countdown to entry in whole seconds, rounded up.
pub fn entry_offset_seconds(now: DateTime<Utc>) -> i64 {
    (entry_offset_millis(now) + 999) / 1_000
}

/// Entry instant for a signal generated at `now` (on a whole minute).
pub fn entry_time(now: DateTime<Utc>) -> DateTime<Utc> {
    let whole_milli = now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000_000));
    whole_milli + Duration::milliseconds(entry_offset_millis(now))
}

/// Default expiry for a timeframe: one bar.
pub fn expiry_minutes(timeframe: Timeframe) -> u32 {
    timeframe.minutes()
}

/// Expiry tuned to the tape for intraday timeframes. Longer timeframes keep
/// the one-bar default.
///
/// Fast markets halve the expiry, quiet ones stretch it by half, and a strong
/// trend earns another quarter. Never below one minute.
pub fn optimal_expiry(timeframe: Timeframe, volatility: f64, trend_strength: f64) -> u32 {
    let base = expiry_minutes(timeframe);
    if !timeframe.is_intraday() {
        return base;
    }

    let mut minutes = f64::from(base);
    if volatility > 0.02 {
        minutes *= 0.5;
    } else if volatility < 0.005 {
        minutes *= 1.5;
    }
    if trend_strength > 70.0 {
        minutes *= 1.25;
    }
    (minutes.round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, second).unwrap()
    }

    #[test]
    fn test_entry_offset() {
        assert_eq!(entry_offset_seconds(at(0)), 60);
        assert_eq!(entry_offset_seconds(at(15)), 45);
        assert_eq!(entry_offset_seconds(at(57)), 3);
        assert_eq!(entry_offset_seconds(at(58)), 62);
        assert_eq!(entry_offset_seconds(at(59)), 61);
    }

    #[test]
    fn test_entry_lead_counts_milliseconds() {
        let now = at(57) + Duration::milliseconds(900);
        assert_eq!(entry_offset_millis(now), 62_100);
        assert_eq!(entry_offset_seconds(now), 63);

        let entry = entry_time(now);
        assert!(entry - now >= Duration::seconds(MIN_ENTRY_LEAD_SECONDS));
        assert_eq!(entry.second(), 0);
        assert_eq!(entry.minute(), 32);

        let now = at(56) + Duration::milliseconds(999);
        assert_eq!(entry_offset_millis(now), 3_001);
        assert_eq!(entry_offset_seconds(now), 4);
        assert_eq!(entry_time(now).minute(), 31);
    }

    #[test]
    fn test_entry_lead_never_below_minimum() {
        for millis in (0..60_000).step_by(7) {
            let now = at(0) + Duration::milliseconds(millis);
            let entry = entry_time(now);
            assert!(entry - now >= Duration::seconds(MIN_ENTRY_LEAD_SECONDS));
            assert_eq!(entry.nanosecond(), 0);
            assert_eq!(entry.second(), 0);
        }
    }

    #[test]
    fn test_entry_time_on_whole_minute() {
        let now = at(20) + Duration::milliseconds(450);
        let entry = entry_time(now);
        assert_eq!(entry.second(), 0);
        assert_eq!(entry.nanosecond(), 0);
        assert_eq!(entry.minute(), 31);
    }

    #[test]
    fn test_expiry_lookup() {
        assert_eq!(expiry_minutes(Timeframe::OneMinute), 1);
        assert_eq!(expiry_minutes(Timeframe::FourHours), 240);
        assert_eq!(expiry_minutes(Timeframe::Daily), 1440);
        assert_eq!(expiry_minutes(Timeframe::Weekly), 10080);
    }

    #[test]
    fn test_optimal_expiry() {
        assert_eq!(optimal_expiry(Timeframe::FifteenMinutes, 0.01, 50.0), 15);
        assert_eq!(optimal_expiry(Timeframe::FifteenMinutes, 0.03, 50.0), 8);
        assert_eq!(optimal_expiry(Timeframe::FifteenMinutes, 0.001, 50.0), 23);
        assert_eq!(optimal_expiry(Timeframe::FifteenMinutes, 0.01, 80.0), 19);
        assert_eq!(optimal_expiry(Timeframe::OneMinute, 0.05, 0.0), 1);
        // Not intraday: untouched.
        assert_eq!(optimal_expiry(Timeframe::Daily, 0.05, 90.0), 1440);
    }
}
