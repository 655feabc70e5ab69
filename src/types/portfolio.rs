//! Portfolio Types
//!
//! Cash, long/short positions, cost-basis accounting and the trade records
//! the trader appends. All mutation goes through the trader; these types
//! only expose derived metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Margin level below which the margin-call flag is raised.
pub const MARGIN_CALL_LEVEL: f64 = 130.0;

/// What a trade did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
    ShortOpen,
    ShortClose,
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
            TradeKind::ShortOpen => write!(f, "short_open"),
            TradeKind::ShortClose => write!(f, "short_close"),
        }
    }
}

/// An executed order. Trades are append-only within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Trade {
    pub kind: TradeKind,
    pub symbol: String,
    pub quantity: u64,
    pub execution_price: f64,
    /// Commission deducted for this fill (0 when commissions are disabled)
    pub commission: f64,
    #[serde(with = "crate::types::timestamp")]
    pub wall_timestamp: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub sim_timestamp: DateTime<Utc>,
}

/// A long holding. Removed from the portfolio when quantity reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Position {
    pub quantity: u64,
    /// Sum of acquisition costs for the held quantity
    pub total_cost_basis: f64,
}

impl Position {
    /// Average acquisition price per share.
    pub fn avg_cost(&self) -> f64 {
        if self.quantity == 0 {
            0.0
        } else {
            self.total_cost_basis / self.quantity as f64
        }
    }
}

/// A short holding, tracked separately from longs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ShortPosition {
    pub quantity: u64,
    /// Average price the short was opened at
    pub entry_price: f64,
}

/// Per-session account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Portfolio {
    /// May go negative when margin is enabled
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub shorts: BTreeMap<String, ShortPosition>,
    /// Sum of realized gains and losses across all closed quantity
    pub realized_gains: f64,
}

impl Portfolio {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            positions: BTreeMap::new(),
            shorts: BTreeMap::new(),
            realized_gains: 0.0,
        }
    }

    /// Market value of all long positions at the given prices.
    pub fn long_value(&self, price_of: impl Fn(&str) -> f64) -> f64 {
        self.positions
            .iter()
            .map(|(sym, pos)| pos.quantity as f64 * price_of(sym))
            .sum()
    }

    /// Unrealized short P&L: positive while the price is below entry.
    pub fn short_pnl(&self, price_of: impl Fn(&str) -> f64) -> f64 {
        self.shorts
            .iter()
            .map(|(sym, short)| (short.entry_price - price_of(sym)) * short.quantity as f64)
            .sum()
    }

    /// Total account value: cash plus long value plus open short P&L.
    pub fn total_value(&self, price_of: impl Fn(&str) -> f64) -> f64 {
        self.cash + self.long_value(&price_of) + self.short_pnl(&price_of)
    }

    /// Unrealized P&L across longs and shorts.
    pub fn unrealized_pnl(&self, price_of: impl Fn(&str) -> f64) -> f64 {
        let long: f64 = self
            .positions
            .iter()
            .map(|(sym, pos)| pos.quantity as f64 * price_of(sym) - pos.total_cost_basis)
            .sum();
        long + self.short_pnl(price_of)
    }

    /// Margin currently in use: borrowed cash plus open short exposure.
    pub fn used_margin(&self, price_of: impl Fn(&str) -> f64) -> f64 {
        let borrowed = (-self.cash).max(0.0);
        let short_exposure: f64 = self
            .shorts
            .iter()
            .map(|(sym, short)| short.quantity as f64 * price_of(sym))
            .sum();
        borrowed + short_exposure
    }

    /// `equity / used_margin * 100`, or `None` when no margin is in use.
    pub fn margin_level(&self, price_of: impl Fn(&str) -> f64 + Copy) -> Option<f64> {
        let used = self.used_margin(price_of);
        if used <= 0.0 {
            return None;
        }
        Some(self.total_value(price_of) / used * 100.0)
    }

    /// Observable margin-call flag; callers decide policy.
    pub fn margin_call(&self, price_of: impl Fn(&str) -> f64 + Copy) -> bool {
        self.margin_level(price_of)
            .map(|level| level < MARGIN_CALL_LEVEL)
            .unwrap_or(false)
    }
}

/// Consistent portfolio read served by the API and push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDetails {
    pub cash: f64,
    pub total_value: f64,
    pub unrealized_pnl: f64,
    pub realized_gains: f64,
    pub margin_level: Option<f64>,
    pub margin_call: bool,
    pub positions: Vec<PositionDetails>,
    pub shorts: Vec<ShortDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDetails {
    pub symbol: String,
    pub quantity: u64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortDetails {
    pub symbol: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
}
