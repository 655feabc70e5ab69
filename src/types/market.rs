//! Market State Types
//!
//! Per-session, per-symbol price state and the snapshot shapes served over
//! the API and the push channel.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum retained price-history points per symbol.
pub const HISTORY_RETENTION: usize = 1024;

/// Evolving price state for one symbol inside one session.
///
/// Only `price` and `prev_delta` carry simulation state; `history` is
/// observational and bounded to [`HISTORY_RETENTION`] points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceState {
    /// Current price, always > 0
    pub price: f64,
    /// Previous-step price delta, carried for momentum
    pub prev_delta: f64,
    /// Bounded append-only history, oldest first
    pub history: VecDeque<f64>,
}

impl PriceState {
    pub fn new(base_price: f64) -> Self {
        let mut history = VecDeque::with_capacity(HISTORY_RETENTION);
        history.push_back(base_price);
        Self {
            price: base_price,
            prev_delta: 0.0,
            history,
        }
    }

    /// Record a newly computed price, dropping the oldest point when the
    /// retention bound is reached.
    pub fn record(&mut self, new_price: f64) {
        self.prev_delta = new_price - self.price;
        self.price = new_price;
        if self.history.len() >= HISTORY_RETENTION {
            self.history.pop_front();
        }
        self.history.push_back(new_price);
    }
}

/// One symbol's view in a market snapshot response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    /// Delta since the previous tick
    pub change: f64,
    /// Percentage change since the previous tick
    pub change_pct: f64,
}

impl MarketQuote {
    pub fn from_state(symbol: &str, state: &PriceState) -> Self {
        let prev = state.price - state.prev_delta;
        let change_pct = if prev > 0.0 {
            state.prev_delta / prev * 100.0
        } else {
            0.0
        };
        Self {
            symbol: symbol.to_string(),
            price: state.price,
            change: state.prev_delta,
            change_pct,
        }
    }
}

/// A price movement produced by one tick, fanned out to `market_data`
/// subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDelta {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    /// Simulated-day index the delta occurred on
    pub day: i64,
}

/// End-of-day portfolio valuation record kept per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DailyStat {
    /// Simulated-day index
    pub day: i64,
    /// Total portfolio value at the day boundary
    pub value: f64,
}
