//! Instrument Types
//!
//! Static instrument definitions loaded from the catalog. Instruments are
//! immutable after load; per-session price state lives in `types::market`.

use serde::{Deserialize, Serialize};

/// Category of a tradable instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// High-volatility growth stocks
    Growth,
    /// Dividend payers, lower volatility
    Dividend,
    /// Exchange-traded funds
    Etf,
    /// Bonds, near-flat volatility
    Bond,
}

impl InstrumentKind {
    /// Fixed per-tick volatility override for bonds; other kinds use the
    /// instrument's base volatility scaled by risk and difficulty.
    pub fn volatility_floor(&self) -> Option<f64> {
        match self {
            InstrumentKind::Bond => Some(0.002),
            _ => None,
        }
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentKind::Growth => write!(f, "growth"),
            InstrumentKind::Dividend => write!(f, "dividend"),
            InstrumentKind::Etf => write!(f, "etf"),
            InstrumentKind::Bond => write!(f, "bond"),
        }
    }
}

/// A tradable instrument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Short identifier, 1-5 uppercase characters
    pub symbol: String,
    /// Human-readable name
    pub display_name: String,
    /// Price the simulation seeds from
    pub base_price: f64,
    /// Instrument category
    pub kind: InstrumentKind,
    /// Per-tick volatility before risk/difficulty scaling
    pub base_volatility: f64,
}

impl Instrument {
    pub fn new(
        symbol: &str,
        display_name: &str,
        base_price: f64,
        kind: InstrumentKind,
        base_volatility: f64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
            base_price,
            kind,
            base_volatility,
        }
    }
}
