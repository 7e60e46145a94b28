//! Live price simulation.
//!
//! Each tick moves a quote by a bounded random step plus an optional push in
//! the direction of its current change. The step function is pure; callers
//! inject the random source.

use crate::{change_percent, Quote, UtcDateTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Half-width of the uniform step, as a fraction of price.
    pub volatility: f64,
    pub momentum_probability: f64,
    /// Momentum push, as a fraction of the volatility step.
    pub momentum_scale: f64,
    /// Lowest allowed price after a tick, as a fraction of the pre-tick price.
    pub floor_ratio: f64,
    pub max_volume_increment: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            volatility: 0.0015,
            momentum_probability: 0.6,
            momentum_scale: 0.2,
            floor_ratio: 0.8,
            max_volume_increment: 500,
        }
    }
}

impl SimulationParams {
    /// Upper bound of `p' / p` for a single tick.
    pub fn max_up_ratio(&self) -> f64 {
        1.0 + self.volatility + self.volatility * self.momentum_scale
    }
}

/// Advances `quote` by one tick.
///
/// Only price, change, change percent, high, low, volume and `last_updated`
/// move; identity, `open`, `previous_close` and provenance are carried over.
pub fn tick(quote: &Quote, params: &SimulationParams, rng: &mut fastrand::Rng, now: UtcDateTime) -> Quote {
    let price = quote.price;
    let step = params.volatility * price;

    let random_move = (rng.f64() - 0.5) * 2.0 * step;
    let momentum = if rng.f64() < params.momentum_probability {
        let direction = if quote.change >= 0.0 { 1.0 } else { -1.0 };
        direction * step * params.momentum_scale
    } else {
        0.0
    };

    let next_price = (price + random_move + momentum).max(params.floor_ratio * price);
    let change = quote.change + (next_price - price);

    Quote {
        price: next_price,
        change,
        change_percent: change_percent(change, quote.previous_close),
        high: quote.high.max(next_price),
        low: quote.low.min(next_price),
        volume: quote
            .volume
            .saturating_add(rng.u64(0..=params.max_volume_increment)),
        last_updated: now,
        ..quote.clone()
    }
}

/// Stateful wrapper owning the random source, used by the scheduler's tick timer.
#[derive(Debug)]
pub struct SimulationEngine {
    params: SimulationParams,
    rng: fastrand::Rng,
}

impl SimulationEngine {
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(params: SimulationParams, seed: u64) -> Self {
        Self {
            params,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn tick(&mut self, quote: &Quote, now: UtcDateTime) -> Quote {
        tick(quote, &self.params, &mut self.rng, now)
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{synthetic, SessionPhase, Symbol};

    fn quote(symbol: &str) -> Quote {
        let now = UtcDateTime::parse("2025-08-14T05:00:00Z").expect("timestamp");
        let symbol = Symbol::parse(symbol).expect("valid");
        synthetic::synthesize(&symbol, SessionPhase::Open, now, &mut fastrand::Rng::with_seed(11))
    }

    #[test]
    fn tick_keeps_identity_and_anchors() {
        let before = quote("KOTAKBANK");
        let now = UtcDateTime::parse("2025-08-14T05:00:01Z").expect("timestamp");

        let after = tick(&before, &SimulationParams::default(), &mut fastrand::Rng::with_seed(5), now);

        assert_eq!(after.symbol, before.symbol);
        assert_eq!(after.open, before.open);
        assert_eq!(after.previous_close, before.previous_close);
        assert_eq!(after.is_real_data, before.is_real_data);
        assert_eq!(after.last_updated, now);
        assert!(after.volume >= before.volume);
        assert!(after.volume <= before.volume + 500);
    }

    #[test]
    fn change_tracks_price_move() {
        let before = quote("WIPRO");
        let after = tick(
            &before,
            &SimulationParams::default(),
            &mut fastrand::Rng::with_seed(9),
            before.last_updated,
        );

        let moved = after.price - before.price;
        assert!((after.change - (before.change + moved)).abs() < 1e-9);
        let expected_percent = after.change / before.previous_close * 100.0;
        assert!((after.change_percent - expected_percent).abs() < 1e-9);
    }

    #[test]
    fn floor_caps_a_crash() {
        let params = SimulationParams {
            volatility: 5.0,
            momentum_probability: 0.0,
            ..SimulationParams::default()
        };
        let before = quote("ITC");

        for seed in 0..100 {
            let after = tick(&before, &params, &mut fastrand::Rng::with_seed(seed), before.last_updated);
            assert!(after.price >= before.price * 0.8 - 1e-9);
        }
    }

    #[test]
    fn engine_is_reproducible_with_seed() {
        let start = quote("SUNPHARMA");
        let mut first = SimulationEngine::with_seed(SimulationParams::default(), 77);
        let mut second = SimulationEngine::with_seed(SimulationParams::default(), 77);

        let a = first.tick(&start, start.last_updated);
        let b = second.tick(&start, start.last_updated);
        assert_eq!(a, b);
    }
}
