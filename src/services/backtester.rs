//! Historical-performance backtester.
//!
//! Replays a strategy's entry rule over a price series and judges every
//! signal a fixed number of samples later. The resulting statistics feed a
//! score bonus for strategy selection.
//! - entry rule evaluated every `stride` samples from `start_index`
//! - a CALL wins if the price `horizon` samples later is higher, a PUT if lower
//! - unchanged prices count as losses

use crate::services::signals::indicators::{
    bollinger_bands, fibonacci_levels, ichimoku, macd, rsi, sma, support_resistance,
};
use crate::services::signals::relative_distance;
use crate::types::{Direction, HistoricalPerformance, StrategyKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Replay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSettings {
    /// First sample an entry rule is evaluated at.
    pub start_index: usize,
    /// Samples between evaluations.
    pub stride: usize,
    /// Samples between entry and judgement.
    pub horizon: usize,
    /// Number of latest signals in the recent win rate.
    pub recent_window: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            start_index: 30,
            stride: 5,
            horizon: 10,
            recent_window: 20,
        }
    }
}

/// The direction `key` would enter with, seeing only `prices`.
pub fn entry_signal(key: StrategyKey, prices: &[f64]) -> Option<Direction> {
    let price = *prices.last()?;
    match key {
        StrategyKey::RsiDivergence => {
            let value = rsi(prices, 14);
            if value < 30.0 {
                Some(Direction::Call)
            } else if value > 70.0 {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::MacdCrossover => {
            let now = macd(prices);
            let before = macd(&prices[..prices.len() - 1]);
            if before.histogram <= 0.0 && now.histogram > 0.0 {
                Some(Direction::Call)
            } else if before.histogram >= 0.0 && now.histogram < 0.0 {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::BollingerBreakout => {
            let bands = bollinger_bands(prices, 20, 2.0);
            if bands.is_degenerate() {
                None
            } else if price > bands.upper {
                Some(Direction::Call)
            } else if price < bands.lower {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::SupportResistance => {
            let levels = support_resistance(prices, 50);
            if relative_distance(price, levels.support) <= 0.01 {
                Some(Direction::Call)
            } else if relative_distance(price, levels.resistance) <= 0.01 {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::TrendFollowing => {
            let (short, long) = (sma(prices, 10), sma(prices, 30));
            if short > long && price > short {
                Some(Direction::Call)
            } else if short < long && price < short {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::FibonacciRetracement => {
            let near_level = fibonacci_levels(prices, 50)
                .nearest_distance(price)
                .map(|d| d <= 0.005)
                .unwrap_or(false);
            let trend = sma(prices, 30);
            match (near_level, price > trend, price < trend) {
                (true, true, _) => Some(Direction::Call),
                (true, _, true) => Some(Direction::Put),
                _ => None,
            }
        }
        StrategyKey::IchimokuCloud => {
            let reading = ichimoku(prices);
            if reading.bullish_cross() {
                Some(Direction::Call)
            } else if reading.bearish_cross() {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::MomentumScalping => {
            let recent = &prices[prices.len().saturating_sub(4)..];
            if recent.len() < 4 {
                None
            } else if recent.windows(2).all(|w| w[1] > w[0]) {
                Some(Direction::Call)
            } else if recent.windows(2).all(|w| w[1] < w[0]) {
                Some(Direction::Put)
            } else {
                None
            }
        }
        StrategyKey::RangeTrading => {
            let bands = bollinger_bands(prices, 20, 2.0);
            if bands.is_degenerate() {
                return None;
            }
            let position = (price - bands.lower) / (bands.upper - bands.lower);
            if position < 0.2 {
                Some(Direction::Call)
            } else if position > 0.8 {
                Some(Direction::Put)
            } else {
                None
            }
        }
    }
}

/// Score bonus for a set of replay statistics.
pub fn performance_bonus(performance: &HistoricalPerformance) -> f64 {
    if performance.sample_size == 0 {
        return 0.0;
    }

    let win_rate = performance.win_rate;
    let mut bonus = if win_rate > 70.0 {
        25.0
    } else if win_rate > 60.0 {
        15.0
    } else if win_rate > 50.0 {
        5.0
    } else if win_rate < 40.0 {
        -15.0
    } else {
        0.0
    };

    if performance.recent_sample_size >= 5 {
        if performance.recent_win_rate > 70.0 {
            bonus += 15.0;
        } else if performance.recent_win_rate < 40.0 {
            bonus -= 20.0;
        }
    }

    if performance.max_win_streak > 5 {
        bonus += 10.0;
    }
    if performance.max_loss_streak > 5 {
        bonus -= 15.0;
    }
    bonus
}

fn win_rate(outcomes: &[bool]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().filter(|won| **won).count() as f64 / outcomes.len() as f64 * 100.0
}

/// Longest runs of wins and of losses.
fn streaks(outcomes: &[bool]) -> (u32, u32) {
    let mut max_win = 0;
    let mut max_loss = 0;
    let mut current = 0;
    let mut last = None;

    for won in outcomes {
        current = if last == Some(*won) { current + 1 } else { 1 };
        last = Some(*won);
        if *won {
            max_win = max_win.max(current);
        } else {
            max_loss = max_loss.max(current);
        }
    }
    (max_win, max_loss)
}

/// Replays entry rules against price history.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backtester {
    settings: BacktestSettings,
}

impl Backtester {
    pub fn new(settings: BacktestSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    /// Win/loss of every signal the rule produced, oldest first.
    pub fn replay(&self, key: StrategyKey, prices: &[f64]) -> Vec<bool> {
        let BacktestSettings {
            start_index,
            stride,
            horizon,
            ..
        } = self.settings;

        let mut outcomes = Vec::new();
        let mut index = start_index;
        while index + horizon < prices.len() {
            if let Some(direction) = entry_signal(key, &prices[..=index]) {
                let entry = prices[index];
                let exit = prices[index + horizon];
                outcomes.push(match direction {
                    Direction::Call => exit > entry,
                    Direction::Put => exit < entry,
                });
            }
            index += stride.max(1);
        }
        outcomes
    }

    /// Replay statistics and bonus for `key` over `prices`.
    pub fn run(&self, key: StrategyKey, prices: &[f64]) -> HistoricalPerformance {
        let outcomes = self.replay(key, prices);
        let recent = &outcomes[outcomes.len().saturating_sub(self.settings.recent_window)..];
        let (max_win_streak, max_loss_streak) = streaks(&outcomes);

        let mut performance = HistoricalPerformance {
            win_rate: win_rate(&outcomes),
            sample_size: outcomes.len() as u32,
            max_win_streak,
            max_loss_streak,
            recent_win_rate: win_rate(recent),
            recent_sample_size: recent.len() as u32,
            bonus: 0.0,
        };
        performance.bonus = performance_bonus(&performance);

        debug!(
            "Backtest {}: {} signals, {:.1}% wins, bonus {}",
            key.id(),
            performance.sample_size,
            performance.win_rate,
            performance.bonus
        );
        performance
    }
}
