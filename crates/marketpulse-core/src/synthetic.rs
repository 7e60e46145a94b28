//! Synthetic quotes and bars used whenever the upstream cannot answer.
//!
//! Generators are pure functions of the symbol, the instant and an injected
//! [`fastrand::Rng`]; a seeded generator reproduces the same output.

use time::Duration;

use crate::{format_market_cap, Bar, BarSeries, Quote, SessionPhase, Symbol, UtcDateTime};

/// Static description of one instrument in the basket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentProfile {
    pub symbol: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
    pub base_price: f64,
    pub base_change: f64,
}

const fn profile(
    symbol: &'static str,
    name: &'static str,
    sector: &'static str,
    base_price: f64,
    base_change: f64,
) -> InstrumentProfile {
    InstrumentProfile {
        symbol,
        name,
        sector,
        base_price,
        base_change,
    }
}

const UNIVERSE: [InstrumentProfile; 20] = [
    profile("RELIANCE", "Reliance Industries Limited", "Energy & Petrochemicals", 2456.75, 12.50),
    profile("TCS", "Tata Consultancy Services Limited", "Information Technology", 3112.00, -8.45),
    profile("INFY", "Infosys Limited", "Information Technology", 1505.80, 5.25),
    profile("HDFCBANK", "HDFC Bank Limited", "Banking & Financial Services", 1425.30, -3.20),
    profile("ICICIBANK", "ICICI Bank Limited", "Banking & Financial Services", 890.45, 2.15),
    profile("SBIN", "State Bank of India", "Banking & Financial Services", 550.80, 1.25),
    profile("BHARTIARTL", "Bharti Airtel Limited", "Telecommunications", 780.25, -2.75),
    profile("KOTAKBANK", "Kotak Mahindra Bank Limited", "Banking & Financial Services", 1650.40, 8.60),
    profile("HINDUNILVR", "Hindustan Unilever Limited", "FMCG", 2450.60, -5.80),
    profile("ITC", "ITC Limited", "FMCG & Diversified", 420.35, 1.45),
    profile("LT", "Larsen & Toubro Limited", "Engineering & Construction", 3250.80, 15.20),
    profile("HCLTECH", "HCL Technologies Limited", "Information Technology", 1250.45, -3.75),
    profile("AXISBANK", "Axis Bank Limited", "Banking & Financial Services", 950.20, 2.80),
    profile("MARUTI", "Maruti Suzuki India Limited", "Automobile", 9800.75, -25.50),
    profile("ASIANPAINT", "Asian Paints Limited", "Paints & Chemicals", 2850.90, 12.80),
    profile("SUNPHARMA", "Sun Pharmaceutical Industries", "Pharmaceuticals", 1250.25, -4.35),
    profile("TITAN", "Titan Company Limited", "Consumer Goods - Luxury", 3250.40, 18.60),
    profile("ULTRACEMCO", "UltraTech Cement Limited", "Cement & Construction", 8500.60, -15.75),
    profile("NESTLEIND", "Nestle India Limited", "FMCG", 23500.45, 125.80),
    profile("WIPRO", "Wipro Limited", "Information Technology", 420.80, -1.25),
];

const DEFAULT_PRICE: f64 = 1000.0;
const DEFAULT_SECTOR: &str = "Diversified";

/// The fixed basket, in display order.
pub fn universe() -> &'static [InstrumentProfile] {
    &UNIVERSE
}

/// Symbols of the basket, in display order.
pub fn universe_symbols() -> Vec<Symbol> {
    UNIVERSE
        .iter()
        .filter_map(|profile| Symbol::parse(profile.symbol).ok())
        .collect()
}

pub fn lookup(symbol: &Symbol) -> Option<&'static InstrumentProfile> {
    UNIVERSE.iter().find(|profile| profile.symbol == symbol.as_str())
}

/// Display name, falling back to `<SYMBOL> Limited`.
pub fn display_name(symbol: &Symbol) -> String {
    lookup(symbol)
        .map(|profile| profile.name.to_owned())
        .unwrap_or_else(|| format!("{} Limited", symbol.as_str()))
}

pub fn sector_of(symbol: &Symbol) -> &'static str {
    lookup(symbol).map(|profile| profile.sector).unwrap_or(DEFAULT_SECTOR)
}

pub fn base_price_of(symbol: &Symbol) -> f64 {
    lookup(symbol)
        .map(|profile| profile.base_price)
        .unwrap_or(DEFAULT_PRICE)
}

/// Fallback quote. `is_real_data` is always false.
///
/// Price and change come from the instrument table; every other field is a
/// bounded random offset around the base price, chosen so that
/// `low <= min(open, price)` and `max(open, price) <= high` both hold and
/// the whole day range stays within ±1.5% of the base.
pub fn synthesize(
    symbol: &Symbol,
    phase: SessionPhase,
    now: UtcDateTime,
    rng: &mut fastrand::Rng,
) -> Quote {
    let (price, change) = lookup(symbol)
        .map(|profile| (profile.base_price, profile.base_change))
        .unwrap_or((DEFAULT_PRICE, 0.0));
    let previous_close = price - change;

    let open = price * (1.0 + uniform(rng, -0.01, 0.01));
    let high = open.max(price) + rng.f64() * 0.005 * price;
    let low = open.min(price) - rng.f64() * 0.005 * price;

    Quote {
        symbol: symbol.clone(),
        name: display_name(symbol),
        price,
        change,
        change_percent: change / previous_close * 100.0,
        open,
        high,
        low,
        previous_close,
        volume: rng.u64(1_000_000..6_000_000),
        sector: sector_of(symbol).to_owned(),
        market_cap: format_market_cap(Some(price * uniform(rng, 50_000_000.0, 150_000_000.0))),
        pe_ratio: Some(uniform(rng, 15.0, 55.0)),
        dividend_yield: Some(uniform(rng, 0.0, 2.5)),
        year_high: Some(price * 1.15),
        year_low: Some(price * 0.85),
        avg_volume: Some(rng.u64(500_000..3_500_000)),
        beta: Some(uniform(rng, 0.8, 2.0)),
        last_updated: now,
        is_real_data: false,
        market_status: phase,
        is_closing_price: false,
        stored_at: None,
    }
}

const HISTORY_DAYS: i64 = 30;
const HISTORY_VOLATILITY: f64 = 0.015;

/// Daily random walk ending at `now`, 31 bars oldest first.
pub fn synthesize_history(symbol: &Symbol, now: UtcDateTime, rng: &mut fastrand::Rng) -> BarSeries {
    let base = base_price_of(symbol);
    let mut current = base;
    let mut bars = Vec::with_capacity(HISTORY_DAYS as usize + 1);

    for days_back in (0..=HISTORY_DAYS).rev() {
        let ts = now - Duration::days(days_back);
        let step = uniform(rng, -1.0, 1.0) * HISTORY_VOLATILITY * current;
        let next = (current + step).max(base * 0.01);

        let open = current;
        let close = next;
        let high = open.max(close) + rng.f64() * HISTORY_VOLATILITY * base;
        let low = (open.min(close) - rng.f64() * HISTORY_VOLATILITY * base).max(base * 0.005);
        let volume = rng.u64(500_000..2_500_000);

        // Bounds hold by construction; a rejected bar is skipped rather than clamped.
        if let Ok(bar) = Bar::new(ts, open, high, low, close, volume) {
            bars.push(bar);
        }
        current = next;
    }

    BarSeries {
        symbol: symbol.clone(),
        bars,
        is_real_data: false,
    }
}

fn uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}
