use crate::error::{AppError, Result};
use crate::types::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling granularity a series is analyzed at.
///
/// Declaration order is ascending duration, so the derived `Ord` compares
/// timeframes by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1")]
    OneMinute,
    #[serde(rename = "5")]
    FiveMinutes,
    #[serde(rename = "15")]
    FifteenMinutes,
    #[serde(rename = "30")]
    ThirtyMinutes,
    #[serde(rename = "60")]
    OneHour,
    #[serde(rename = "240")]
    FourHours,
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
}

impl Timeframe {
    /// Every supported timeframe, shortest first.
    pub const ALL: [Timeframe; 8] = [
        Timeframe::OneMinute,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::Daily,
        Timeframe::Weekly,
    ];

    /// Parse from the wire id ("1", "5", ..., "D", "W").
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "1" => Some(Self::OneMinute),
            "5" => Some(Self::FiveMinutes),
            "15" => Some(Self::FifteenMinutes),
            "30" => Some(Self::ThirtyMinutes),
            "60" => Some(Self::OneHour),
            "240" => Some(Self::FourHours),
            "D" | "1D" | "1440" => Some(Self::Daily),
            "W" | "1W" | "10080" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// Parse, reporting unknown ids as an error.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| AppError::InvalidTimeframe(s.to_string()))
    }

    /// Wire id.
    pub fn id(&self) -> &'static str {
        match self {
            Self::OneMinute => "1",
            Self::FiveMinutes => "5",
            Self::FifteenMinutes => "15",
            Self::ThirtyMinutes => "30",
            Self::OneHour => "60",
            Self::FourHours => "240",
            Self::Daily => "D",
            Self::Weekly => "W",
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::Daily => "1D",
            Self::Weekly => "1W",
        }
    }

    /// Duration in minutes. Doubles as the default expiry lookup.
    pub fn minutes(&self) -> u32 {
        match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
            Self::FourHours => 240,
            Self::Daily => 1440,
            Self::Weekly => 10080,
        }
    }

    /// Timeframes up to one hour.
    pub fn is_intraday(&self) -> bool {
        self.minutes() <= 60
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Classified market regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketCondition {
    StrongTrendUp,
    TrendUp,
    Sideways,
    TrendDown,
    StrongTrendDown,
    Volatile,
    Unknown,
}

impl MarketCondition {
    /// TREND_UP or STRONG_TREND_UP.
    pub fn is_uptrend(&self) -> bool {
        matches!(self, Self::StrongTrendUp | Self::TrendUp)
    }

    /// TREND_DOWN or STRONG_TREND_DOWN.
    pub fn is_downtrend(&self) -> bool {
        matches!(self, Self::StrongTrendDown | Self::TrendDown)
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, Self::StrongTrendUp | Self::StrongTrendDown)
    }

    /// Direction the regime leans, if it is a trend.
    pub fn trend_direction(&self) -> Option<Direction> {
        if self.is_uptrend() {
            Some(Direction::Call)
        } else if self.is_downtrend() {
            Some(Direction::Put)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongTrendUp => "Strong Uptrend",
            Self::TrendUp => "Uptrend",
            Self::Sideways => "Sideways",
            Self::TrendDown => "Downtrend",
            Self::StrongTrendDown => "Strong Downtrend",
            Self::Volatile => "Volatile",
            Self::Unknown => "Unknown",
        }
    }
}

/// Price and volume samples for one symbol, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSeries {
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl MarketSeries {
    /// Create a series, rejecting mismatched lengths.
    pub fn new(prices: Vec<f64>, volumes: Vec<f64>) -> Result<Self> {
        if prices.len() != volumes.len() {
            return Err(AppError::InvalidSeries(format!(
                "{} prices but {} volumes",
                prices.len(),
                volumes.len()
            )));
        }
        Ok(Self { prices, volumes })
    }

    /// A series that never moves.
    pub fn flat(price: f64, volume: f64, len: usize) -> Self {
        Self {
            prices: vec![price; len],
            volumes: vec![volume; len],
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_from_str() {
        assert_eq!(Timeframe::from_str("1"), Some(Timeframe::OneMinute));
        assert_eq!(Timeframe::from_str("240"), Some(Timeframe::FourHours));
        assert_eq!(Timeframe::from_str("d"), Some(Timeframe::Daily));
        assert_eq!(Timeframe::from_str("W"), Some(Timeframe::Weekly));
        assert_eq!(Timeframe::from_str("7"), None);
    }

    #[test]
    fn test_timeframe_parse_error() {
        let err = Timeframe::parse("2h").unwrap_err();
        assert!(matches!(err, AppError::InvalidTimeframe(_)));
    }

    #[test]
    fn test_timeframe_ordering_follows_minutes() {
        for pair in Timeframe::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].minutes() < pair[1].minutes());
        }
    }

    #[test]
    fn test_condition_trend_direction() {
        assert_eq!(MarketCondition::TrendUp.trend_direction(), Some(Direction::Call));
        assert_eq!(MarketCondition::StrongTrendDown.trend_direction(), Some(Direction::Put));
        assert_eq!(MarketCondition::Sideways.trend_direction(), None);
        assert_eq!(MarketCondition::Volatile.trend_direction(), None);
    }

    #[test]
    fn test_series_length_mismatch() {
        assert!(MarketSeries::new(vec![1.0, 2.0], vec![1.0]).is_err());
        let series = MarketSeries::new(vec![1.0, 2.0], vec![5.0, 6.0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_price(), Some(2.0));
    }
}
