//! Mode Policies
//!
//! Day-boundary hooks and reports for the per-mode rulesets. Trading-time
//! admission rules live in the trader; everything here is observation.

use crate::services::Catalog;
use crate::types::{AllocationReport, InstrumentKind, ModeState, Portfolio};
use std::collections::BTreeMap;
use tracing::debug;

/// Total simulated-day budget for a custom session, if any.
pub fn day_budget(mode: &ModeState) -> Option<i64> {
    match mode {
        ModeState::Custom {
            start_day,
            weeks_budget,
        } => Some(start_day + *weeks_budget as i64 * 7),
        _ => None,
    }
}

/// Apply day-rollover policy. Called once per simulated-day boundary with
/// the portfolio value observed at the boundary.
pub fn on_day_rollover(
    mode: &mut ModeState,
    new_day: i64,
    portfolio_value: f64,
    initial_capital: f64,
) {
    match mode {
        ModeState::DayTrader {
            trades_today,
            current_sim_day,
            ..
        } => {
            // Single atomic reset before the next tick's broadcast.
            *trades_today = 0;
            *current_sim_day = new_day;
        }
        ModeState::Challenge {
            daily_target,
            days_completed,
            streak_days,
        } => {
            if portfolio_value - initial_capital >= *daily_target {
                *days_completed += 1;
                *streak_days += 1;
                debug!(day = new_day, streak = *streak_days, "challenge target met");
            } else {
                *streak_days = 0;
            }
        }
        ModeState::Classic | ModeState::Portfolio { .. } | ModeState::Custom { .. } => {}
    }
}

/// Current-vs-target allocation fractions by instrument kind. Informational
/// only; nothing rebalances.
pub fn allocation_report(
    mode: &ModeState,
    portfolio: &Portfolio,
    catalog: &Catalog,
    price_of: impl Fn(&str) -> f64,
) -> Option<AllocationReport> {
    let ModeState::Portfolio { target_allocation } = mode else {
        return None;
    };

    let mut by_kind: BTreeMap<InstrumentKind, f64> = BTreeMap::new();
    let mut total = 0.0;
    for (symbol, position) in &portfolio.positions {
        if let Some(inst) = catalog.get(symbol) {
            let value = position.quantity as f64 * price_of(symbol);
            *by_kind.entry(inst.kind).or_insert(0.0) += value;
            total += value;
        }
    }

    let current = if total > 0.0 {
        by_kind
            .into_iter()
            .map(|(kind, value)| (kind, value / total))
            .collect()
    } else {
        BTreeMap::new()
    };

    Some(AllocationReport {
        current,
        target: target_allocation.clone(),
    })
}
