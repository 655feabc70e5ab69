//! Simulated Clock
//!
//! Monotonic simulated-time source. The clock owns no timer; the per-session
//! scheduler pumps it. One external tick advances one simulated day.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum wall interval between ticks, regardless of speed.
const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Result of asking the clock to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAdvance {
    /// Advanced by this many simulated days
    Advanced(u32),
    /// A week budget is consumed; the clock refused to move
    Exhausted,
}

/// Simulated-time source for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Simulated date the session started at
    pub start: DateTime<Utc>,
    /// Current simulated date
    pub current: DateTime<Utc>,
    /// Acceleration factor, clamped to 0.1..=10.0
    pub speed: f64,
}

impl SimClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            current: start,
            speed: 1.0,
        }
    }

    /// Restore a clock at a given simulated position.
    pub fn resumed(start: DateTime<Utc>, current: DateTime<Utc>) -> Self {
        Self {
            start,
            current,
            speed: 1.0,
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
    }

    /// Integer day index since the session's simulated start date.
    pub fn day_count(&self) -> i64 {
        (self.current - self.start).num_days()
    }

    /// Advance by `days`, honoring an optional total-day budget.
    pub fn advance(&mut self, days: u32, budget_days: Option<i64>) -> ClockAdvance {
        let allowed = match budget_days {
            Some(budget) => {
                let remaining = budget - self.day_count();
                if remaining <= 0 {
                    return ClockAdvance::Exhausted;
                }
                days.min(remaining as u32)
            }
            None => days,
        };
        self.current += ChronoDuration::days(allowed as i64);
        ClockAdvance::Advanced(allowed)
    }

    /// Wall interval between scheduler ticks: `max(1000 / speed, 50)` ms.
    pub fn tick_interval(&self) -> Duration {
        let ms = (1000.0 / self.speed) as u64;
        Duration::from_millis(ms.max(MIN_TICK_INTERVAL_MS))
    }
}
