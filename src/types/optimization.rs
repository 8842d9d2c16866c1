use crate::types::{Direction, MarketCondition, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved result of a past signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalResult {
    Win,
    Loss,
}

/// A past signal and (once known) its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub confidence: f64,
    /// `None` while the signal is still pending.
    pub result: Option<SignalResult>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl OutcomeRecord {
    /// Create a pending record.
    pub fn new(symbol: &str, timeframe: Timeframe, direction: Direction, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_uppercase(),
            timeframe,
            direction,
            confidence,
            result: None,
            timestamp: Utc::now(),
            strategy: None,
        }
    }

    pub fn with_result(mut self, result: SignalResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_win(&self) -> bool {
        self.result == Some(SignalResult::Win)
    }
}

/// Heuristic adjustments learned from past outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationProfile {
    pub symbol: String,
    /// Overall win rate of completed records (0-100).
    pub win_rate: f64,
    pub sample_size: u32,
    pub confidence_adjustment: f64,
    pub recommended_timeframes: Vec<Timeframe>,
    pub volatility_threshold: f64,
    /// Seconds added to the entry countdown.
    pub entry_timing_adjustment: i64,
    pub expiry_minutes_adjustment: i64,
    pub preferred_conditions: Vec<MarketCondition>,
    pub avoided_conditions: Vec<MarketCondition>,
    pub last_updated: DateTime<Utc>,
}
