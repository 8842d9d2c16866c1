use crate::types::{MarketCondition, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Binary direction of a leaf signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Call => Direction::Put,
            Direction::Put => Direction::Call,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Call => "CALL",
            Direction::Put => "PUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ternary direction of the aggregate vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfluenceDirection {
    Call,
    Put,
    Neutral,
}

impl ConfluenceDirection {
    /// The leaf direction this aggregate agrees with, if any.
    pub fn as_direction(&self) -> Option<Direction> {
        match self {
            ConfluenceDirection::Call => Some(Direction::Call),
            ConfluenceDirection::Put => Some(Direction::Put),
            ConfluenceDirection::Neutral => None,
        }
    }
}

impl From<Direction> for ConfluenceDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Call => ConfluenceDirection::Call,
            Direction::Put => ConfluenceDirection::Put,
        }
    }
}

/// Directional decision for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeSignal {
    pub timeframe: Timeframe,
    pub label: String,
    pub direction: Direction,
    /// 0-100 (the analyzer keeps it within 55-95).
    pub confidence: f64,
    /// 0-100.
    pub strength: f64,
    pub market_condition: MarketCondition,
}

impl TimeframeSignal {
    pub fn new(
        timeframe: Timeframe,
        direction: Direction,
        confidence: f64,
        strength: f64,
        market_condition: MarketCondition,
    ) -> Self {
        Self {
            timeframe,
            label: timeframe.label().to_string(),
            direction,
            confidence: confidence.clamp(0.0, 100.0),
            strength: strength.clamp(0.0, 100.0),
            market_condition,
        }
    }
}

/// How strongly each technical component supports the signal direction (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalScores {
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub trend: f64,
    pub volume: f64,
    pub overall: f64,
}

/// Detailed signal for the requested timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimarySignal {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    /// 60-96.
    pub confidence: f64,
    pub current_price: f64,
    pub entry_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    pub expiry_minutes: u32,
    /// Seconds from generation until entry.
    pub countdown_seconds: i64,
    pub support: f64,
    pub resistance: f64,
    pub volatility: f64,
    pub trend_strength: f64,
    pub market_condition: MarketCondition,
    pub technical_scores: TechnicalScores,
    /// Names of the indicators and adjustments that contributed.
    pub indicators: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Aggregate multi-timeframe decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub primary_signal: PrimarySignal,
    pub timeframes: Vec<TimeframeSignal>,
    /// 0-95.
    pub overall_confluence: u8,
    pub confluence_direction: ConfluenceDirection,
    pub countdown_seconds: i64,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Call.opposite(), Direction::Put);
        assert_eq!(Direction::Put.opposite(), Direction::Call);
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::Call).unwrap(), "\"CALL\"");
        assert_eq!(
            serde_json::to_string(&ConfluenceDirection::Neutral).unwrap(),
            "\"NEUTRAL\""
        );
    }

    #[test]
    fn test_timeframe_signal_clamps() {
        let signal = TimeframeSignal::new(
            Timeframe::FiveMinutes,
            Direction::Put,
            140.0,
            -5.0,
            MarketCondition::Sideways,
        );
        assert_eq!(signal.confidence, 100.0);
        assert_eq!(signal.strength, 0.0);
        assert_eq!(signal.label, "5m");
    }

    #[test]
    fn test_confluence_direction_conversion() {
        assert_eq!(ConfluenceDirection::from(Direction::Put), ConfluenceDirection::Put);
        assert_eq!(ConfluenceDirection::Neutral.as_direction(), None);
    }
}
