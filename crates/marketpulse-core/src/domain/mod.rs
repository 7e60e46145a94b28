//! # Domain Models
//!
//! Canonical types shared by every marketpulse component.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Quote`] | Instrument snapshot with provenance flags |
//! | [`Bar`] | OHLCV bar with timestamp |
//! | [`BarSeries`] | Bars for one symbol plus provenance |
//! | [`SessionPhase`] | Exchange trading state |
//! | [`Symbol`] | Validated base ticker |
//! | [`Interval`] / [`HistoryRange`] | History request shape |
//! | [`UtcDateTime`] | UTC instant |
//!
//! `Symbol` is the join key across the orchestrator, the closing snapshot and
//! the simulator; it always holds the ticker without the `.NS` listing suffix.

mod interval;
mod models;
mod phase;
mod symbol;
mod timestamp;

pub use interval::{HistoryRange, Interval};
pub use models::{change_percent, format_market_cap, Bar, BarSeries, Quote};
pub use phase::SessionPhase;
pub use symbol::{Symbol, EXCHANGE_SUFFIX};
pub use timestamp::UtcDateTime;
