//! Timer-driven scheduler that keeps a [`MarketBoard`] current.
//!
//! Three tasks share one board:
//!
//! | Task | Cadence | Action |
//! |------|---------|--------|
//! | phase poll | `phase_poll` | Re-resolves the session phase; the only writer of `board.phase` |
//! | refresh | `refresh_open` / `refresh_closed` | Re-fetches the basket through the orchestrator |
//! | tick | `tick` | Advances displayed quotes while the board says `Open` |
//!
//! Entering `Open` clears the closing snapshot and wakes the refresh task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::service::MarketDataService;
use crate::simulation::SimulationEngine;
use crate::{Quote, SessionPhase, Symbol, UtcDateTime, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub tick: Duration,
    pub phase_poll: Duration,
    pub refresh_open: Duration,
    pub refresh_closed: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            phase_poll: Duration::from_secs(30),
            refresh_open: Duration::from_secs(60),
            refresh_closed: Duration::from_secs(300),
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let cadences = [
            ("schedule.tick", self.tick),
            ("schedule.phase_poll", self.phase_poll),
            ("schedule.refresh_open", self.refresh_open),
            ("schedule.refresh_closed", self.refresh_closed),
        ];
        for (key, cadence) in cadences {
            if cadence.is_zero() {
                return Err(ValidationError::InvalidConfig {
                    key,
                    reason: String::from("must be greater than zero"),
                });
            }
        }
        Ok(())
    }

    pub fn refresh_for(&self, phase: SessionPhase) -> Duration {
        if phase.is_open() {
            self.refresh_open
        } else {
            self.refresh_closed
        }
    }
}

/// Direction of the last price move for a displayed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    Up,
    Down,
    Flat,
}

impl PriceDirection {
    pub fn between(before: f64, after: f64) -> Self {
        if after > before {
            Self::Up
        } else if after < before {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

/// What a consumer currently displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketBoard {
    pub phase: SessionPhase,
    pub quotes: Vec<Quote>,
    pub directions: HashMap<Symbol, PriceDirection>,
    pub last_refresh: Option<UtcDateTime>,
    pub ticks: u64,
}

impl MarketBoard {
    pub fn new(phase: SessionPhase) -> Self {
        Self {
            phase,
            quotes: Vec::new(),
            directions: HashMap::new(),
            last_refresh: None,
            ticks: 0,
        }
    }

    pub fn direction(&self, symbol: &Symbol) -> PriceDirection {
        self.directions
            .get(symbol)
            .copied()
            .unwrap_or(PriceDirection::Flat)
    }

    /// Replaces the displayed quotes, recording direction against the previous prices.
    pub fn replace_quotes(&mut self, quotes: Vec<Quote>, at: UtcDateTime) {
        let previous = self
            .quotes
            .iter()
            .map(|quote| (quote.symbol.clone(), quote.price))
            .collect::<HashMap<_, _>>();

        self.directions = quotes
            .iter()
            .map(|quote| {
                let direction = previous
                    .get(&quote.symbol)
                    .map_or(PriceDirection::Flat, |before| {
                        PriceDirection::between(*before, quote.price)
                    });
                (quote.symbol.clone(), direction)
            })
            .collect();
        self.quotes = quotes;
        self.last_refresh = Some(at);
    }

    /// Advances every live quote. Quotes served from the closing snapshot stay frozen.
    pub fn tick(&mut self, engine: &mut SimulationEngine, now: UtcDateTime) {
        for quote in &mut self.quotes {
            if quote.is_closing_price {
                continue;
            }
            let next = engine.tick(quote, now);
            self.directions
                .insert(next.symbol.clone(), PriceDirection::between(quote.price, next.price));
            *quote = next;
        }
        self.ticks = self.ticks.saturating_add(1);
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Starts the phase poll, refresh and tick tasks on the current runtime.
    pub fn spawn(
        service: Arc<MarketDataService>,
        config: ScheduleConfig,
        engine: SimulationEngine,
    ) -> SchedulerHandle {
        let board = Arc::new(RwLock::new(MarketBoard::new(service.phase())));
        let refresh_now = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            tick_ms = config.tick.as_millis() as u64,
            poll_ms = config.phase_poll.as_millis() as u64,
            "scheduler starting"
        );

        let tasks = vec![
            tokio::spawn(phase_poll_task(
                Arc::clone(&service),
                Arc::clone(&board),
                Arc::clone(&refresh_now),
                config,
                shutdown_rx.clone(),
            )),
            tokio::spawn(refresh_task(
                Arc::clone(&service),
                Arc::clone(&board),
                Arc::clone(&refresh_now),
                config,
                shutdown_rx.clone(),
            )),
            tokio::spawn(tick_task(
                service,
                Arc::clone(&board),
                engine,
                config,
                shutdown_rx,
            )),
        ];

        SchedulerHandle {
            board,
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Owner of the scheduler's tasks. Dropping it without `shutdown` leaves them running.
pub struct SchedulerHandle {
    board: Arc<RwLock<MarketBoard>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Copy of the current board.
    pub async fn board(&self) -> MarketBoard {
        self.board.read().await.clone()
    }

    /// Signals every task to stop and waits for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("scheduler stopped");
    }
}

async fn phase_poll_task(
    service: Arc<MarketDataService>,
    board: Arc<RwLock<MarketBoard>>,
    refresh_now: Arc<Notify>,
    config: ScheduleConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(config.phase_poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let phase = service.phase();
        let previous = {
            let mut board = board.write().await;
            std::mem::replace(&mut board.phase, phase)
        };
        if previous == phase {
            continue;
        }

        info!(from = %previous, to = %phase, "session phase changed");
        if phase.is_open() {
            service.cache().clear().await;
        }
        refresh_now.notify_one();
    }
}

async fn refresh_task(
    service: Arc<MarketDataService>,
    board: Arc<RwLock<MarketBoard>>,
    refresh_now: Arc<Notify>,
    config: ScheduleConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let quotes = service.refresh_all_quotes().await;
        let phase = {
            let mut board = board.write().await;
            board.replace_quotes(quotes, service.now());
            board.phase
        };
        let wait = config.refresh_for(phase);
        debug!(phase = %phase, wait_ms = wait.as_millis() as u64, "board refreshed");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = refresh_now.notified() => {}
            _ = shutdown.changed() => break,
        }
    }
}

async fn tick_task(
    service: Arc<MarketDataService>,
    board: Arc<RwLock<MarketBoard>>,
    mut engine: SimulationEngine,
    config: ScheduleConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(config.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let mut board = board.write().await;
        if board.phase.is_open() {
            board.tick(&mut engine, service.now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{synthetic, SessionPhase};

    fn at(value: &str) -> UtcDateTime {
        UtcDateTime::parse(value).expect("timestamp")
    }

    fn quote(symbol: &str, price: f64) -> Quote {
        let symbol = Symbol::parse(symbol).expect("valid");
        let mut quote = synthetic::synthesize(
            &symbol,
            SessionPhase::Open,
            at("2025-08-14T05:00:00Z"),
            &mut fastrand::Rng::with_seed(1),
        );
        quote.price = price;
        quote
    }

    #[test]
    fn replace_records_direction_against_previous_prices() {
        let mut board = MarketBoard::new(SessionPhase::Open);
        board.replace_quotes(vec![quote("TCS", 100.0), quote("INFY", 50.0)], at("2025-08-14T05:00:00Z"));
        board.replace_quotes(
            vec![quote("TCS", 101.0), quote("INFY", 49.0), quote("LT", 10.0)],
            at("2025-08-14T05:01:00Z"),
        );

        assert_eq!(board.direction(&Symbol::parse("TCS").expect("valid")), PriceDirection::Up);
        assert_eq!(board.direction(&Symbol::parse("INFY").expect("valid")), PriceDirection::Down);
        assert_eq!(board.direction(&Symbol::parse("LT").expect("valid")), PriceDirection::Flat);
        assert_eq!(board.last_refresh, Some(at("2025-08-14T05:01:00Z")));
    }

    #[test]
    fn tick_skips_closing_prices() {
        let mut frozen = quote("WIPRO", 420.0);
        frozen.is_closing_price = true;
        let mut board = MarketBoard::new(SessionPhase::Open);
        board.replace_quotes(vec![frozen.clone(), quote("ITC", 420.0)], at("2025-08-14T05:00:00Z"));

        let mut engine = SimulationEngine::with_seed(Default::default(), 3);
        board.tick(&mut engine, at("2025-08-14T05:00:01Z"));

        assert_eq!(board.quotes[0], frozen);
        assert_eq!(board.quotes[1].last_updated, at("2025-08-14T05:00:01Z"));
        assert_eq!(board.ticks, 1);
    }

    #[test]
    fn refresh_cadence_depends_on_phase() {
        let config = ScheduleConfig::default();
        assert_eq!(config.refresh_for(SessionPhase::Open), Duration::from_secs(60));
        assert_eq!(config.refresh_for(SessionPhase::Weekend), Duration::from_secs(300));
        assert!(ScheduleConfig {
            tick: Duration::ZERO,
            ..config
        }
        .validate()
        .is_err());
    }
}
