//! Price Engine
//!
//! Per-tick stochastic price evolution. Each tick advances a symbol one
//! logical day: uniform noise scaled by effective volatility, a mild
//! positive drift, momentum carry from the previous step, and rare
//! mutually-exclusive jump/news-gap events.
//!
//! The engine is deterministic for a given RNG stream; all simulation state
//! lives in the caller's [`PriceState`] and the RNG.

use crate::types::{Instrument, InstrumentKind, PriceState};
use rand::Rng;

/// Probability of a fat-tailed jump event on one tick.
const JUMP_PROBABILITY: f64 = 0.005;

/// Probability of a smaller news gap when no jump fires.
const NEWS_PROBABILITY: f64 = 0.02;

/// Prices never fall below this floor.
const PRICE_FLOOR: f64 = 0.01;

/// Momentum carry factor applied to the previous-step delta.
const MOMENTUM_FACTOR: f64 = 0.3;

/// Mild positive drift per tick, as a fraction of price.
const DRIFT_FACTOR: f64 = 0.00005;

/// Effective per-tick volatility for an instrument after risk and
/// difficulty scaling. Bonds use a fixed floor regardless of scaling.
pub fn effective_volatility(
    instrument: &Instrument,
    risk_multiplier: f64,
    difficulty_multiplier: f64,
) -> f64 {
    match instrument.kind.volatility_floor() {
        Some(floor) => floor,
        None => instrument.base_volatility * risk_multiplier * difficulty_multiplier,
    }
}

/// Advance a symbol's price by `ticks` logical days.
///
/// Total on positive prices; never fails. Returns the final price.
pub fn tick<R: Rng>(
    state: &mut PriceState,
    kind: InstrumentKind,
    effective_vol: f64,
    ticks: u32,
    rng: &mut R,
) -> f64 {
    let vol = kind.volatility_floor().unwrap_or(effective_vol);
    for _ in 0..ticks {
        let p = state.price;
        let random = rng.gen_range(-0.5..0.5) * vol * p;
        let drift = DRIFT_FACTOR * p;
        let momentum = MOMENTUM_FACTOR * state.prev_delta;

        // Jump and news gap are mutually exclusive; one roll decides both.
        let event_roll: f64 = rng.gen_range(0.0..1.0);
        let jump = if event_roll < JUMP_PROBABILITY {
            1.0 + rng.gen_range(-0.2..0.2)
        } else if event_roll < JUMP_PROBABILITY + NEWS_PROBABILITY {
            1.0 + rng.gen_range(-0.05..0.05)
        } else {
            1.0
        };

        let new_price = (p * jump + random + drift + momentum).max(PRICE_FLOOR);
        state.record(new_price);
    }
    state.price
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HISTORY_RETENTION;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn growth_instrument() -> Instrument {
        Instrument::new("TEST", "Test Growth", 100.0, InstrumentKind::Growth, 0.02)
    }

    #[test]
    fn test_tick_is_deterministic_for_a_seed() {
        let inst = growth_instrument();
        let vol = effective_volatility(&inst, 1.0, 1.0);

        let mut a = PriceState::new(inst.base_price);
        let mut b = PriceState::new(inst.base_price);
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            tick(&mut a, inst.kind, vol, 1, &mut rng_a);
            tick(&mut b, inst.kind, vol, 1, &mut rng_b);
        }
        assert_eq!(a.price, b.price);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_price_stays_positive() {
        let inst = Instrument::new("WILD", "Wild", 0.05, InstrumentKind::Growth, 0.05);
        let vol = effective_volatility(&inst, 1.8, 1.3);
        let mut state = PriceState::new(inst.base_price);
        let mut rng = StdRng::seed_from_u64(7);

        tick(&mut state, inst.kind, vol, 10_000, &mut rng);
        assert!(state.history.iter().all(|p| *p > 0.0));
        assert!(state.price >= 0.01);
    }

    #[test]
    fn test_bond_volatility_is_fixed() {
        let bond = Instrument::new("TB10", "Treasury", 95.0, InstrumentKind::Bond, 0.03);
        assert_eq!(effective_volatility(&bond, 1.8, 1.3), 0.002);

        let growth = growth_instrument();
        let scaled = effective_volatility(&growth, 1.8, 1.3);
        assert!((scaled - 0.02 * 1.8 * 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_history_is_bounded() {
        let inst = growth_instrument();
        let vol = effective_volatility(&inst, 1.0, 1.0);
        let mut state = PriceState::new(inst.base_price);
        let mut rng = StdRng::seed_from_u64(3);

        tick(&mut state, inst.kind, vol, (HISTORY_RETENTION as u32) + 500, &mut rng);
        assert_eq!(state.history.len(), HISTORY_RETENTION);
        assert_eq!(*state.history.back().unwrap(), state.price);
    }

    #[test]
    fn test_multiple_ticks_advance_multiple_days() {
        let inst = growth_instrument();
        let vol = effective_volatility(&inst, 1.0, 1.0);
        let mut state = PriceState::new(inst.base_price);
        let mut rng = StdRng::seed_from_u64(11);

        let before = state.history.len();
        tick(&mut state, inst.kind, vol, 5, &mut rng);
        assert_eq!(state.history.len(), before + 5);
    }
}
