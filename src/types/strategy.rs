use crate::types::MarketCondition;
use serde::{Deserialize, Serialize};

/// Catalog strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKey {
    RsiDivergence,
    MacdCrossover,
    BollingerBreakout,
    SupportResistance,
    TrendFollowing,
    FibonacciRetracement,
    IchimokuCloud,
    MomentumScalping,
    RangeTrading,
}

impl StrategyKey {
    pub fn id(&self) -> &'static str {
        match self {
            Self::RsiDivergence => "rsi_divergence",
            Self::MacdCrossover => "macd_crossover",
            Self::BollingerBreakout => "bollinger_breakout",
            Self::SupportResistance => "support_resistance",
            Self::TrendFollowing => "trend_following",
            Self::FibonacciRetracement => "fibonacci_retracement",
            Self::IchimokuCloud => "ichimoku_cloud",
            Self::MomentumScalping => "momentum_scalping",
            Self::RangeTrading => "range_trading",
        }
    }
}

/// Risk tier of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDescriptor {
    pub key: StrategyKey,
    pub name: &'static str,
    pub description: &'static str,
    pub indicators_used: &'static [&'static str],
    pub suitable_conditions: &'static [MarketCondition],
    pub risk_tier: RiskTier,
}

impl StrategyDescriptor {
    pub fn suits(&self, condition: MarketCondition) -> bool {
        self.suitable_conditions.contains(&condition)
    }
}

/// Outcome of replaying a strategy's entry rule over a series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPerformance {
    /// Percentage of winning signals (0-100).
    pub win_rate: f64,
    /// Number of replayed signals.
    pub sample_size: u32,
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
    /// Win rate over the most recent signals.
    pub recent_win_rate: f64,
    pub recent_sample_size: u32,
    /// Score bonus (may be negative).
    pub bonus: f64,
}

/// A runner-up in strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAlternative {
    pub key: StrategyKey,
    pub name: &'static str,
    pub score: f64,
}

/// Winning strategy for the current regime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredStrategy {
    pub descriptor: StrategyDescriptor,
    pub score: f64,
    /// The strategy-specific technical alignment term.
    pub technical_score: f64,
    pub historical_performance: HistoricalPerformance,
    pub market_condition: MarketCondition,
    /// Other compatible strategies, best first.
    pub alternatives: Vec<StrategyAlternative>,
}
