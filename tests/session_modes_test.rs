//! Mode ruleset tests: day-trader caps, custom week budgets, challenge
//! streaks, portfolio allocation reporting, and config clamping.

use paperfloor::services::{trader, Catalog, Session, SessionOwner, TradeError};
use paperfloor::types::{
    Difficulty, GameMode, ModeState, RiskLevel, SessionConfig, MAX_STARTING_CAPITAL,
};
use std::sync::Arc;

const SYM: &str = "NVTX";

fn session(mode: GameMode, weeks: u32) -> Session {
    let config = SessionConfig {
        starting_capital: 50_000.0,
        risk_level: RiskLevel::Moderate,
        difficulty: Difficulty::Medium,
        mode,
        weeks,
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        "mode-test".to_string(),
        SessionOwner::User("u1".to_string()),
        config,
        Arc::new(Catalog::builtin()),
        7,
    );
    session
        .price_states
        .get_mut(SYM)
        .unwrap()
        .record(100.0);
    session
}

// =============================================================================
// Day trader
// =============================================================================

#[test]
fn test_day_trade_limit_resets_on_rollover() {
    let mut session = session(GameMode::DayTrader, 1);

    trader::buy(&mut session, SYM, 1).unwrap();
    trader::buy(&mut session, SYM, 1).unwrap();
    trader::buy(&mut session, SYM, 1).unwrap();

    let err = trader::buy(&mut session, SYM, 1).unwrap_err();
    assert!(matches!(err, TradeError::DayTradeLimitExceeded { max: 3 }));

    // Next simulated day: the counter resets atomically.
    let report = session.tick(1);
    assert!(report.day_rolled);
    trader::buy(&mut session, SYM, 1).unwrap();

    match &session.mode {
        ModeState::DayTrader { trades_today, .. } => assert_eq!(*trades_today, 1),
        other => panic!("unexpected mode state: {:?}", other),
    }
}

#[test]
fn test_sells_count_against_the_cap() {
    let mut session = session(GameMode::DayTrader, 1);

    trader::buy(&mut session, SYM, 2).unwrap();
    trader::sell(&mut session, SYM, 1).unwrap();
    trader::sell(&mut session, SYM, 1).unwrap();

    assert!(matches!(
        trader::buy(&mut session, SYM, 1),
        Err(TradeError::DayTradeLimitExceeded { .. })
    ));
}

// =============================================================================
// Custom week budget
// =============================================================================

#[test]
fn test_custom_week_budget_stops_the_clock() {
    let mut session = session(GameMode::Custom, 1);
    // Custom mode forces its fixed starting tuple.
    assert_eq!(session.initial_capital, 10_000.0);

    for day in 1..=7 {
        let report = session.tick(1);
        assert!(!report.exhausted, "day {} should advance", day);
        assert_eq!(report.advanced_days, 1);
    }
    assert_eq!(session.clock.day_count(), 7);

    // The eighth day is a no-op: clock frozen, portfolio untouched.
    let cash_before = session.portfolio.cash;
    let report = session.tick(1);
    assert!(report.exhausted);
    assert_eq!(report.advanced_days, 0);
    assert_eq!(session.clock.day_count(), 7);
    assert_eq!(session.portfolio.cash, cash_before);

    // Orders are refused once the budget is consumed.
    assert!(matches!(
        trader::buy(&mut session, SYM, 1),
        Err(TradeError::WeekBudgetExhausted)
    ));
}

#[test]
fn test_custom_budget_day_count_never_exceeds_budget() {
    let mut session = session(GameMode::Custom, 2);
    for _ in 0..50 {
        session.tick(1);
    }
    assert_eq!(session.clock.day_count(), 14);
}

// =============================================================================
// Challenge
// =============================================================================

#[test]
fn test_challenge_tracks_target_and_streak() {
    let mut session = session(GameMode::Challenge, 1);
    // Target is 5% of starting capital.
    match &session.mode {
        ModeState::Challenge { daily_target, .. } => {
            assert!((daily_target - 2_500.0).abs() < 1e-9)
        }
        other => panic!("unexpected mode state: {:?}", other),
    }

    // Ride a position far above target, then roll a day.
    trader::buy(&mut session, SYM, 400).unwrap();
    session.price_states.get_mut(SYM).unwrap().record(150.0);
    session.tick(1);

    match &session.mode {
        ModeState::Challenge {
            days_completed,
            streak_days,
            ..
        } => {
            assert_eq!(*days_completed, 1);
            assert_eq!(*streak_days, 1);
        }
        other => panic!("unexpected mode state: {:?}", other),
    }
}

// =============================================================================
// Config normalization
// =============================================================================

#[test]
fn test_starting_capital_is_clamped() {
    let config = SessionConfig {
        starting_capital: 5_000_000.0,
        ..SessionConfig::default()
    };
    let session = Session::new(
        "clamp-test".to_string(),
        SessionOwner::User("u1".to_string()),
        config,
        Arc::new(Catalog::builtin()),
        1,
    );
    assert_eq!(session.initial_capital, MAX_STARTING_CAPITAL);
    assert_eq!(session.portfolio.cash, MAX_STARTING_CAPITAL);
}

#[test]
fn test_daily_stats_append_on_rollover() {
    let mut session = session(GameMode::Classic, 1);
    for _ in 0..5 {
        session.tick(1);
    }
    assert_eq!(session.daily_stats.len(), 5);
    let days: Vec<i64> = session.daily_stats.iter().map(|s| s.day).collect();
    assert_eq!(days, vec![1, 2, 3, 4, 5]);
}
