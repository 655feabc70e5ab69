//! Session Configuration Types
//!
//! The per-session ruleset: starting capital, risk and difficulty scaling,
//! game mode, and the mode-specific state the clock and trader dispatch on.

use crate::types::InstrumentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Starting capital is clamped to this ceiling.
pub const MAX_STARTING_CAPITAL: f64 = 1_000_000.0;

/// Day-trader mode allows this many buys/sells per simulated day.
pub const MAX_TRADES_PER_DAY: u32 = 3;

/// Challenge mode daily target as a fraction of starting capital.
pub const CHALLENGE_TARGET_FRACTION: f64 = 0.05;

/// Bot sessions start with this much cash.
pub const BOT_STARTING_CAPITAL: f64 = 100_000.0;

/// Commission rate applied on the bot-order path.
pub const BOT_COMMISSION_RATE: f64 = 0.001;

/// Risk appetite, scaling instrument volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    pub fn multiplier(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 0.5,
            RiskLevel::Moderate => 1.0,
            RiskLevel::Aggressive => 1.8,
        }
    }
}

/// Difficulty, scaling instrument volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.6,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.3,
        }
    }
}

/// Game mode selecting the session's ruleset variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Classic,
    Challenge,
    #[serde(rename = "daytrader")]
    DayTrader,
    Portfolio,
    Custom,
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameMode::Classic => write!(f, "classic"),
            GameMode::Challenge => write!(f, "challenge"),
            GameMode::DayTrader => write!(f, "daytrader"),
            GameMode::Portfolio => write!(f, "portfolio"),
            GameMode::Custom => write!(f, "custom"),
        }
    }
}

/// Session configuration, fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SessionConfig {
    pub starting_capital: f64,
    pub risk_level: RiskLevel,
    pub difficulty: Difficulty,
    pub mode: GameMode,
    /// Session length in weeks; only meaningful in custom mode
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default)]
    pub show_day_counter: bool,
    /// Commission as a fraction of notional, applied on both sides
    #[serde(default)]
    pub commission_rate: f64,
    /// Buy admission allows cost up to `cash * margin_multiplier`
    #[serde(default = "default_margin")]
    pub margin_multiplier: f64,
}

fn default_weeks() -> u32 {
    1
}

fn default_margin() -> f64 {
    1.0
}

impl SessionConfig {
    /// Clamp and normalize a requested config. Custom mode forces its fixed
    /// capital/risk/difficulty tuple.
    pub fn normalized(mut self) -> Self {
        self.starting_capital = self.starting_capital.clamp(0.0, MAX_STARTING_CAPITAL);
        self.weeks = self.weeks.max(1);
        self.margin_multiplier = self.margin_multiplier.max(1.0);
        if self.mode == GameMode::Custom {
            self.starting_capital = 10_000.0;
            self.risk_level = RiskLevel::Moderate;
            self.difficulty = Difficulty::Medium;
        }
        self
    }

    pub fn margin_enabled(&self) -> bool {
        self.margin_multiplier > 1.0
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_capital: 25_000.0,
            risk_level: RiskLevel::Moderate,
            difficulty: Difficulty::Medium,
            mode: GameMode::Classic,
            weeks: 1,
            show_day_counter: false,
            commission_rate: 0.0,
            margin_multiplier: 1.0,
        }
    }
}

/// Mode-specific state, discriminated by the session's game mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ModeState {
    Classic,
    #[serde(rename = "daytrader")]
    DayTrader {
        trades_today: u32,
        max_trades_per_day: u32,
        current_sim_day: i64,
    },
    Challenge {
        daily_target: f64,
        days_completed: u32,
        streak_days: u32,
    },
    Portfolio {
        target_allocation: BTreeMap<InstrumentKind, f64>,
    },
    Custom {
        start_day: i64,
        weeks_budget: u32,
    },
}

impl ModeState {
    /// Initial mode state for a freshly created session.
    pub fn for_config(config: &SessionConfig) -> Self {
        match config.mode {
            GameMode::Classic => ModeState::Classic,
            GameMode::DayTrader => ModeState::DayTrader {
                trades_today: 0,
                max_trades_per_day: MAX_TRADES_PER_DAY,
                current_sim_day: 0,
            },
            GameMode::Challenge => ModeState::Challenge {
                daily_target: config.starting_capital * CHALLENGE_TARGET_FRACTION,
                days_completed: 0,
                streak_days: 0,
            },
            GameMode::Portfolio => ModeState::Portfolio {
                target_allocation: default_target_allocation(),
            },
            GameMode::Custom => ModeState::Custom {
                start_day: 0,
                weeks_budget: config.weeks,
            },
        }
    }
}

fn default_target_allocation() -> BTreeMap<InstrumentKind, f64> {
    let mut target = BTreeMap::new();
    target.insert(InstrumentKind::Growth, 0.4);
    target.insert(InstrumentKind::Dividend, 0.3);
    target.insert(InstrumentKind::Etf, 0.2);
    target.insert(InstrumentKind::Bond, 0.1);
    target
}

/// Current-vs-target allocation report for portfolio mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub current: BTreeMap<InstrumentKind, f64>,
    pub target: BTreeMap<InstrumentKind, f64>,
}
