//! # Marketpulse Core
//!
//! Market data orchestration and simulation for a fixed basket of NSE equities.
//!
//! ## Overview
//!
//! - **Calendar resolver** classifying any instant into a session phase
//! - **Synthetic generator** producing internally consistent fallback quotes and bars
//! - **Quote orchestrator** batching upstream calls and filling gaps per symbol
//! - **Closing price cache** frozen once per trading day
//! - **Simulation engine** walking displayed quotes while the session is open
//! - **Scheduler** driving all of the above from three timers
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream adapters (Yahoo via yfapi.net) |
//! | [`calendar`] | Session phases, holidays, next open |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`clock`] | Injectable wall clock |
//! | [`closing_cache`] | Once-per-day closing snapshot |
//! | [`config`] | Environment-driven service settings |
//! | [`domain`] | Quote, Bar, Symbol, SessionPhase, UtcDateTime |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`orchestrator`] | Batched fetch with synthetic fill-in |
//! | [`provider`] | Upstream provider trait and errors |
//! | [`scheduler`] | Phase poll, refresh and tick timers |
//! | [`service`] | Consumer-facing read API |
//! | [`simulation`] | Bounded random-walk tick |
//! | [`synthetic`] | Instrument table and fallback generators |
//! | [`throttling`] | Inter-batch pacing |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Scheduler    │──── tick ────▶ Simulation Engine
//! └────────┬────────┘
//!          │ phase poll / refresh
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ MarketData      │────▶│ Calendar         │
//! │ Service         │     └──────────────────┘
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ Closing Cache    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ QuoteProvider   │────▶│ HTTP Client      │
//! │ (Yahoo/offline) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! The read API never fails: upstream errors degrade to synthetic data,
//! flagged through `Quote::is_real_data`. Fallible edges (parsing symbols,
//! timestamps and configuration) return [`ValidationError`].
//!
//! ```rust
//! use marketpulse_core::{Symbol, ValidationError};
//!
//! let symbol = Symbol::parse("reliance.ns").expect("valid");
//! assert_eq!(symbol.as_str(), "RELIANCE");
//! assert!(matches!(Symbol::parse(""), Err(ValidationError::EmptySymbol)));
//! ```

pub mod adapters;
pub mod calendar;
pub mod circuit_breaker;
pub mod clock;
pub mod closing_cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod orchestrator;
pub mod provider;
pub mod scheduler;
pub mod service;
pub mod simulation;
pub mod synthetic;
pub mod throttling;

pub use adapters::{YahooAdapter, YahooConfig};
pub use calendar::{HolidayCalendar, MarketCalendar, SessionStatus, TradingHours};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use closing_cache::ClosingPriceCache;
pub use config::ServiceConfig;
pub use domain::{
    change_percent, format_market_cap, Bar, BarSeries, HistoryRange, Interval, Quote,
    SessionPhase, Symbol, UtcDateTime, EXCHANGE_SUFFIX,
};
pub use error::ValidationError;
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use orchestrator::{FetchPolicy, QuoteOrchestrator};
pub use provider::{OfflineProvider, ProviderError, ProviderErrorKind, QuoteProvider, RawQuote};
pub use scheduler::{MarketBoard, PriceDirection, ScheduleConfig, Scheduler, SchedulerHandle};
pub use service::MarketDataService;
pub use simulation::{SimulationEngine, SimulationParams};
pub use throttling::BatchThrottle;
