//! Session
//!
//! A session binds one config, clock, market tape, portfolio, trade log and
//! mode state into a private trading context owned by a user or bot. All
//! mutation happens under the registry's per-session mutex.

use crate::services::{modes, price_engine, Catalog, ClockAdvance, SimClock};
use crate::types::{
    DailyStat, MarketDelta, MarketQuote, ModeState, Portfolio, PortfolioDetails, PositionDetails,
    PriceState, SessionConfig, SessionSnapshot, ShortDetails, SimulatorSnapshot, StockSnapshot,
    Trade,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Who owns a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOwner {
    User(String),
    Bot(String),
    /// Server-owned reference session driving the shared market feed
    System,
}

impl SessionOwner {
    /// Stable key used for broadcast filtering and registry indexes.
    pub fn key(&self) -> &str {
        match self {
            SessionOwner::User(id) | SessionOwner::Bot(id) => id,
            SessionOwner::System => "system",
        }
    }
}

/// Result of one scheduler tick against a session.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub advanced_days: u32,
    /// Custom-mode week budget is consumed; nothing moved
    pub exhausted: bool,
    /// One delta per symbol whose price changed
    pub deltas: Vec<MarketDelta>,
    pub day_rolled: bool,
    pub day: i64,
    pub total_value: f64,
    pub cash: f64,
    pub unrealized_pnl: f64,
}

/// A private trading context: one portfolio, one simulated market tape.
pub struct Session {
    pub id: String,
    pub owner: SessionOwner,
    pub config: SessionConfig,
    pub clock: SimClock,
    pub price_states: BTreeMap<String, PriceState>,
    pub portfolio: Portfolio,
    pub trades: Vec<Trade>,
    pub mode: ModeState,
    pub start_time: DateTime<Utc>,
    pub initial_capital: f64,
    pub daily_stats: Vec<DailyStat>,
    catalog: Arc<Catalog>,
    rng: StdRng,
}

impl Session {
    /// Create a fresh session seeded from the catalog's base prices.
    pub fn new(
        id: String,
        owner: SessionOwner,
        config: SessionConfig,
        catalog: Arc<Catalog>,
        seed: u64,
    ) -> Self {
        let config = config.normalized();
        let start = crate::types::timestamp::now();
        let price_states = catalog
            .iter()
            .map(|inst| (inst.symbol.clone(), PriceState::new(inst.base_price)))
            .collect();
        let mode = ModeState::for_config(&config);
        Self {
            id,
            owner,
            clock: SimClock::new(start),
            price_states,
            portfolio: Portfolio::new(config.starting_capital),
            trades: Vec::new(),
            mode,
            start_time: start,
            initial_capital: config.starting_capital,
            daily_stats: Vec::new(),
            config,
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current price for a symbol, 0.0 when unknown.
    pub fn price_of(&self, symbol: &str) -> f64 {
        self.price_states
            .get(symbol)
            .map(|s| s.price)
            .unwrap_or(0.0)
    }

    /// Advance the session by `ticks` simulated days, evolving every symbol
    /// and applying day-boundary mode policy.
    pub fn tick(&mut self, ticks: u32) -> TickReport {
        let day_before = self.clock.day_count();
        let budget = modes::day_budget(&self.mode);

        let advanced = match self.clock.advance(ticks, budget) {
            ClockAdvance::Exhausted => {
                return TickReport {
                    advanced_days: 0,
                    exhausted: true,
                    deltas: Vec::new(),
                    day_rolled: false,
                    day: day_before,
                    total_value: self.portfolio_value(),
                    cash: self.portfolio.cash,
                    unrealized_pnl: self.unrealized_pnl(),
                };
            }
            ClockAdvance::Advanced(days) => days,
        };

        let day = self.clock.day_count();
        let risk = self.config.risk_level.multiplier();
        let difficulty = self.config.difficulty.multiplier();

        let mut deltas = Vec::with_capacity(self.price_states.len());
        for (symbol, state) in self.price_states.iter_mut() {
            let Some(inst) = self.catalog.get(symbol) else {
                continue;
            };
            let before = state.price;
            let vol = price_engine::effective_volatility(inst, risk, difficulty);
            let after = price_engine::tick(state, inst.kind, vol, advanced, &mut self.rng);
            if after != before {
                deltas.push(MarketDelta {
                    symbol: symbol.clone(),
                    price: after,
                    change: after - before,
                    day,
                });
            }
        }

        let total_value = self.portfolio_value();
        let day_rolled = day > day_before;
        if day_rolled {
            modes::on_day_rollover(&mut self.mode, day, total_value, self.initial_capital);
            self.daily_stats.push(DailyStat {
                day,
                value: total_value,
            });
        }

        TickReport {
            advanced_days: advanced,
            exhausted: false,
            deltas,
            day_rolled,
            day,
            total_value,
            cash: self.portfolio.cash,
            unrealized_pnl: self.unrealized_pnl(),
        }
    }

    pub fn portfolio_value(&self) -> f64 {
        self.portfolio.total_value(|sym| self.price_of(sym))
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.portfolio.unrealized_pnl(|sym| self.price_of(sym))
    }

    /// Session return percentage against starting capital.
    pub fn return_pct(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.portfolio_value() - self.initial_capital) / self.initial_capital * 100.0
    }

    /// Consistent snapshot of the full market tape.
    pub fn market_quotes(&self) -> Vec<MarketQuote> {
        self.price_states
            .iter()
            .map(|(symbol, state)| MarketQuote::from_state(symbol, state))
            .collect()
    }

    /// Consistent portfolio read: cash, positions and shorts valued at the
    /// same instant.
    pub fn portfolio_details(&self) -> PortfolioDetails {
        let price_of = |sym: &str| self.price_of(sym);
        let positions = self
            .portfolio
            .positions
            .iter()
            .map(|(symbol, pos)| {
                let current = self.price_of(symbol);
                PositionDetails {
                    symbol: symbol.clone(),
                    quantity: pos.quantity,
                    avg_cost: pos.avg_cost(),
                    current_price: current,
                    market_value: pos.quantity as f64 * current,
                    unrealized_pnl: pos.quantity as f64 * current - pos.total_cost_basis,
                }
            })
            .collect();
        let shorts = self
            .portfolio
            .shorts
            .iter()
            .map(|(symbol, short)| {
                let current = self.price_of(symbol);
                ShortDetails {
                    symbol: symbol.clone(),
                    quantity: short.quantity,
                    entry_price: short.entry_price,
                    current_price: current,
                    unrealized_pnl: (short.entry_price - current) * short.quantity as f64,
                }
            })
            .collect();

        PortfolioDetails {
            cash: self.portfolio.cash,
            total_value: self.portfolio.total_value(price_of),
            unrealized_pnl: self.portfolio.unrealized_pnl(price_of),
            realized_gains: self.portfolio.realized_gains,
            margin_level: self.portfolio.margin_level(price_of),
            margin_call: self.portfolio.margin_call(price_of),
            positions,
            shorts,
        }
    }

    /// Serialize the complete session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let stocks = self
            .price_states
            .iter()
            .map(|(symbol, state)| {
                (
                    symbol.clone(),
                    StockSnapshot {
                        price: state.price,
                        prev_delta: state.prev_delta,
                    },
                )
            })
            .collect();
        let price_history = self
            .price_states
            .iter()
            .map(|(symbol, state)| (symbol.clone(), state.history.iter().copied().collect()))
            .collect();

        SessionSnapshot {
            config: self.config.clone(),
            simulator: SimulatorSnapshot {
                config: self.config.clone(),
                portfolio: self.portfolio.clone(),
                stocks,
                price_history,
                simulated_time: self.clock.current,
                trades: self.trades.clone(),
                mode_state: self.mode.clone(),
                start_time: self.start_time,
                initial_capital: self.initial_capital,
                daily_stats: self.daily_stats.clone(),
            },
        }
    }

    /// Rebuild a session from a snapshot. The RNG stream restarts from the
    /// given seed; everything observable round-trips.
    pub fn restore(
        id: String,
        owner: SessionOwner,
        snapshot: SessionSnapshot,
        catalog: Arc<Catalog>,
        seed: u64,
    ) -> Self {
        let sim = snapshot.simulator;
        let mut price_states: BTreeMap<String, PriceState> = BTreeMap::new();
        for (symbol, stock) in sim.stocks {
            let history = sim
                .price_history
                .get(&symbol)
                .map(|h| h.iter().copied().collect())
                .unwrap_or_else(|| std::iter::once(stock.price).collect());
            price_states.insert(
                symbol,
                PriceState {
                    price: stock.price,
                    prev_delta: stock.prev_delta,
                    history,
                },
            );
        }

        Self {
            id,
            owner,
            config: snapshot.config,
            clock: SimClock::resumed(sim.start_time, sim.simulated_time),
            price_states,
            portfolio: sim.portfolio,
            trades: sim.trades,
            mode: sim.mode_state,
            start_time: sim.start_time,
            initial_capital: sim.initial_capital,
            daily_stats: sim.daily_stats,
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}
