//! Static strategy catalog.
//!
//! Declaration order matters: it breaks score ties during selection.

use crate::types::MarketCondition::{
    Sideways, StrongTrendDown, StrongTrendUp, TrendDown, TrendUp, Volatile,
};
use crate::types::{MarketCondition, RiskTier, StrategyDescriptor, StrategyKey};

pub static CATALOG: [StrategyDescriptor; 9] = [
    StrategyDescriptor {
        key: StrategyKey::RsiDivergence,
        name: "RSI Divergence",
        description: "Fades RSI extremes where momentum disagrees with price",
        indicators_used: &["RSI", "Price Action"],
        suitable_conditions: &[Sideways, TrendUp, TrendDown, Volatile],
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        key: StrategyKey::MacdCrossover,
        name: "MACD Crossover",
        description: "Enters on MACD line and signal line crossovers",
        indicators_used: &["MACD", "EMA"],
        suitable_conditions: &[StrongTrendUp, TrendUp, TrendDown, StrongTrendDown],
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        key: StrategyKey::BollingerBreakout,
        name: "Bollinger Breakout",
        description: "Trades closes outside the bands after a squeeze",
        indicators_used: &["Bollinger Bands", "Volume"],
        suitable_conditions: &[Volatile, Sideways],
        risk_tier: RiskTier::High,
    },
    StrategyDescriptor {
        key: StrategyKey::SupportResistance,
        name: "Support & Resistance",
        description: "Buys bounces off support and sells rejections at resistance",
        indicators_used: &["Pivot Levels", "Price Action"],
        suitable_conditions: &[Sideways, TrendUp, TrendDown],
        risk_tier: RiskTier::Low,
    },
    StrategyDescriptor {
        key: StrategyKey::TrendFollowing,
        name: "Trend Following",
        description: "Rides established trends confirmed by volume",
        indicators_used: &["SMA", "EMA", "Volume"],
        suitable_conditions: &[StrongTrendUp, TrendUp, TrendDown, StrongTrendDown],
        risk_tier: RiskTier::Low,
    },
    StrategyDescriptor {
        key: StrategyKey::FibonacciRetracement,
        name: "Fibonacci Retracement",
        description: "Enters pullbacks at Fibonacci levels of the last swing",
        indicators_used: &["Fibonacci", "Trend"],
        suitable_conditions: &[TrendUp, TrendDown],
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        key: StrategyKey::IchimokuCloud,
        name: "Ichimoku Cloud",
        description: "Follows Tenkan/Kijun crosses confirmed by price",
        indicators_used: &["Ichimoku"],
        suitable_conditions: &[StrongTrendUp, TrendUp, TrendDown, StrongTrendDown],
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        key: StrategyKey::MomentumScalping,
        name: "Momentum Scalping",
        description: "Short holds in the direction of consecutive moves",
        indicators_used: &["Price Action", "Volume"],
        suitable_conditions: &[Volatile, StrongTrendUp, StrongTrendDown],
        risk_tier: RiskTier::High,
    },
    StrategyDescriptor {
        key: StrategyKey::RangeTrading,
        name: "Range Trading",
        description: "Buys the bottom and sells the top of a range",
        indicators_used: &["Bollinger Bands", "RSI"],
        suitable_conditions: &[Sideways],
        risk_tier: RiskTier::Low,
    },
];

/// Look up a descriptor by key.
pub fn descriptor(key: StrategyKey) -> &'static StrategyDescriptor {
    CATALOG
        .iter()
        .find(|d| d.key == key)
        .unwrap_or(&CATALOG[0])
}

/// Strategies suited to `condition`, in catalog order.
///
/// Conditions no strategy lists (UNKNOWN) get the SIDEWAYS set.
pub fn compatible(condition: MarketCondition) -> Vec<&'static StrategyDescriptor> {
    let matching: Vec<_> = CATALOG.iter().filter(|d| d.suits(condition)).collect();
    if matching.is_empty() {
        CATALOG.iter().filter(|d| d.suits(Sideways)).collect()
    } else {
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in CATALOG.iter().skip(i + 1) {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn test_every_condition_has_candidates() {
        for condition in [
            StrongTrendUp,
            TrendUp,
            Sideways,
            TrendDown,
            StrongTrendDown,
            Volatile,
            MarketCondition::Unknown,
        ] {
            assert!(!compatible(condition).is_empty(), "{:?}", condition);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_sideways() {
        assert_eq!(compatible(MarketCondition::Unknown), compatible(Sideways));
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(descriptor(StrategyKey::RangeTrading).name, "Range Trading");
        assert_eq!(descriptor(StrategyKey::MacdCrossover).risk_tier, RiskTier::Medium);
    }
}
