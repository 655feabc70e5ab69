//! Trader
//!
//! Order admission and execution against a session's current prices. The
//! trader is a pure operator over a [`Session`]; it holds no state of its
//! own. Every order either fully mutates cash, positions, the trade log and
//! mode state together, or leaves them all untouched.

use crate::services::{modes, Session};
use crate::types::{ModeState, Position, ShortPosition, Trade, TradeKind};
use thiserror::Error;
use tracing::info;

/// Why an order was rejected.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Unknown symbol: {0}")]
    SymbolUnknown(String),

    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Insufficient cash: need {needed:.2}, have {available:.2}")]
    InsufficientCash { needed: f64, available: f64 },

    #[error("Insufficient shares: hold {held}, tried to sell {requested}")]
    InsufficientShares { held: u64, requested: u64 },

    #[error("Day trade limit exceeded: {max} trades per day")]
    DayTradeLimitExceeded { max: u32 },

    #[error("Cannot open a short against an existing long position in {0}")]
    ConflictingLongPosition(String),

    #[error("Cannot buy against an existing short position in {0}")]
    ConflictingShortPosition(String),

    #[error("No short position in {0}")]
    NoShortPosition(String),

    #[error("Quantity exceeds short position: hold {held}, tried to close {requested}")]
    QuantityExceedsShort { held: u64, requested: u64 },

    #[error("Session week budget is exhausted")]
    WeekBudgetExhausted,
}

impl TradeError {
    /// Stable tag surfaced to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            TradeError::SymbolUnknown(_) => "SYMBOL_UNKNOWN",
            TradeError::InvalidQuantity => "INVALID_QUANTITY",
            TradeError::InsufficientCash { .. } => "INSUFFICIENT_CASH",
            TradeError::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            TradeError::DayTradeLimitExceeded { .. } => "DAY_TRADE_LIMIT_EXCEEDED",
            TradeError::ConflictingLongPosition(_) => "CONFLICTING_LONG_POSITION",
            TradeError::ConflictingShortPosition(_) => "CONFLICTING_SHORT_POSITION",
            TradeError::NoShortPosition(_) => "NO_SHORT_POSITION",
            TradeError::QuantityExceedsShort { .. } => "QUANTITY_EXCEEDS_SHORT",
            TradeError::WeekBudgetExhausted => "WEEK_BUDGET_EXHAUSTED",
        }
    }
}

/// Buy `quantity` shares at the current price.
pub fn buy(session: &mut Session, symbol: &str, quantity: u64) -> Result<Trade, TradeError> {
    let symbol = resolve_symbol(session, symbol)?;
    ensure_quantity(quantity)?;
    ensure_week_budget(session)?;
    if session.portfolio.shorts.contains_key(&symbol) {
        return Err(TradeError::ConflictingShortPosition(symbol));
    }

    let price = session.price_of(&symbol);
    let cost = price * quantity as f64;
    let commission = cost * session.config.commission_rate;
    let buying_power = session.portfolio.cash * session.config.margin_multiplier;
    if cost + commission > buying_power {
        return Err(TradeError::InsufficientCash {
            needed: cost + commission,
            available: buying_power,
        });
    }
    check_day_trade_limit(&session.mode)?;

    // Admission passed; mutate everything together.
    session.portfolio.cash -= cost + commission;
    let position = session
        .portfolio
        .positions
        .entry(symbol.clone())
        .or_insert(Position {
            quantity: 0,
            total_cost_basis: 0.0,
        });
    position.quantity += quantity;
    position.total_cost_basis += cost;
    count_day_trade(&mut session.mode);

    let trade = record_trade(session, TradeKind::Buy, &symbol, quantity, price, commission);
    info!(session = %session.id, %symbol, quantity, price, "buy filled");
    Ok(trade)
}

/// Sell `quantity` shares at the current price, average-cost accounting.
pub fn sell(session: &mut Session, symbol: &str, quantity: u64) -> Result<Trade, TradeError> {
    let symbol = resolve_symbol(session, symbol)?;
    ensure_quantity(quantity)?;
    ensure_week_budget(session)?;

    let held = session
        .portfolio
        .positions
        .get(&symbol)
        .map(|p| p.quantity)
        .unwrap_or(0);
    if held < quantity {
        return Err(TradeError::InsufficientShares {
            held,
            requested: quantity,
        });
    }
    check_day_trade_limit(&session.mode)?;

    let price = session.price_of(&symbol);
    let proceeds = price * quantity as f64;
    let commission = proceeds * session.config.commission_rate;

    let position = session
        .portfolio
        .positions
        .get_mut(&symbol)
        .expect("position presence checked above");
    let basis_removed = position.total_cost_basis / position.quantity as f64 * quantity as f64;
    position.quantity -= quantity;
    position.total_cost_basis -= basis_removed;
    if position.quantity == 0 {
        session.portfolio.positions.remove(&symbol);
    }

    session.portfolio.cash += proceeds - commission;
    session.portfolio.realized_gains += proceeds - commission - basis_removed;
    count_day_trade(&mut session.mode);

    let trade = record_trade(session, TradeKind::Sell, &symbol, quantity, price, commission);
    info!(session = %session.id, %symbol, quantity, price, "sell filled");
    Ok(trade)
}

/// Open (or extend) a short position at the current price.
pub fn open_short(session: &mut Session, symbol: &str, quantity: u64) -> Result<Trade, TradeError> {
    let symbol = resolve_symbol(session, symbol)?;
    ensure_quantity(quantity)?;
    ensure_week_budget(session)?;
    if session.portfolio.positions.contains_key(&symbol) {
        return Err(TradeError::ConflictingLongPosition(symbol));
    }

    let price = session.price_of(&symbol);
    let notional = price * quantity as f64;
    let commission = notional * session.config.commission_rate;

    session.portfolio.cash += notional - commission;
    // Shorts have no cost basis to absorb the entry commission, so it posts
    // to realized gains immediately. A closed short's ledger entry then
    // equals its full cash impact: (entry - exit) * qty minus both
    // commissions. Longs differ: the buy-side commission is an acquisition
    // cost outside the ledger, and only the sell side posts on close.
    session.portfolio.realized_gains -= commission;
    let short = session
        .portfolio
        .shorts
        .entry(symbol.clone())
        .or_insert(ShortPosition {
            quantity: 0,
            entry_price: 0.0,
        });
    let combined = short.quantity + quantity;
    short.entry_price = (short.entry_price * short.quantity as f64 + notional) / combined as f64;
    short.quantity = combined;

    let trade = record_trade(
        session,
        TradeKind::ShortOpen,
        &symbol,
        quantity,
        price,
        commission,
    );
    info!(session = %session.id, %symbol, quantity, price, "short opened");
    Ok(trade)
}

/// Close part or all of a short position at the current price.
pub fn close_short(
    session: &mut Session,
    symbol: &str,
    quantity: u64,
) -> Result<Trade, TradeError> {
    let symbol = resolve_symbol(session, symbol)?;
    ensure_quantity(quantity)?;
    ensure_week_budget(session)?;

    let held = match session.portfolio.shorts.get(&symbol) {
        Some(short) => short.quantity,
        None => return Err(TradeError::NoShortPosition(symbol)),
    };
    if quantity > held {
        return Err(TradeError::QuantityExceedsShort {
            held,
            requested: quantity,
        });
    }

    let price = session.price_of(&symbol);
    let notional = price * quantity as f64;
    let commission = notional * session.config.commission_rate;

    let short = session
        .portfolio
        .shorts
        .get_mut(&symbol)
        .expect("short presence checked above");
    // Close-side commission posts here; the open side already posted when
    // the short was opened (see open_short).
    let realized = (short.entry_price - price) * quantity as f64 - commission;
    short.quantity -= quantity;
    if short.quantity == 0 {
        session.portfolio.shorts.remove(&symbol);
    }

    session.portfolio.cash -= notional + commission;
    session.portfolio.realized_gains += realized;

    let trade = record_trade(
        session,
        TradeKind::ShortClose,
        &symbol,
        quantity,
        price,
        commission,
    );
    info!(session = %session.id, %symbol, quantity, price, "short closed");
    Ok(trade)
}

fn resolve_symbol(session: &Session, symbol: &str) -> Result<String, TradeError> {
    let upper = symbol.to_uppercase();
    if session.price_states.contains_key(&upper) {
        Ok(upper)
    } else {
        Err(TradeError::SymbolUnknown(symbol.to_string()))
    }
}

fn ensure_quantity(quantity: u64) -> Result<(), TradeError> {
    if quantity == 0 {
        Err(TradeError::InvalidQuantity)
    } else {
        Ok(())
    }
}

fn ensure_week_budget(session: &Session) -> Result<(), TradeError> {
    if let Some(budget) = modes::day_budget(&session.mode) {
        if session.clock.day_count() >= budget {
            return Err(TradeError::WeekBudgetExhausted);
        }
    }
    Ok(())
}

/// Day-trader mode counts both buys and sells against the daily cap.
fn check_day_trade_limit(mode: &ModeState) -> Result<(), TradeError> {
    if let ModeState::DayTrader {
        trades_today,
        max_trades_per_day,
        ..
    } = mode
    {
        if trades_today >= max_trades_per_day {
            return Err(TradeError::DayTradeLimitExceeded {
                max: *max_trades_per_day,
            });
        }
    }
    Ok(())
}

fn count_day_trade(mode: &mut ModeState) {
    if let ModeState::DayTrader { trades_today, .. } = mode {
        *trades_today += 1;
    }
}

fn record_trade(
    session: &mut Session,
    kind: TradeKind,
    symbol: &str,
    quantity: u64,
    price: f64,
    commission: f64,
) -> Trade {
    let trade = Trade {
        kind,
        symbol: symbol.to_string(),
        quantity,
        execution_price: price,
        commission,
        wall_timestamp: crate::types::timestamp::now(),
        sim_timestamp: session.clock.current,
    };
    session.trades.push(trade.clone());
    trade
}
