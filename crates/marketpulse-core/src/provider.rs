//! Upstream provider contract.
//!
//! The orchestrator only ever asks two questions of an upstream: "quotes for
//! these symbols" and "bars for this symbol". Every answer may be partial or
//! an error; callers decide how to fill the gaps.
//!
//! | Method | Response | Description |
//! |--------|----------|-------------|
//! | [`batch_quote`](QuoteProvider::batch_quote) | `Vec<RawQuote>` | Rows for the symbols the upstream knows |
//! | [`history`](QuoteProvider::history) | [`BarSeries`] | Ordered OHLCV bars |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{BarSeries, HistoryRange, Interval, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Transport failure, non-2xx status or open circuit.
    Unavailable,
    RateLimited,
    Timeout,
    /// Body did not match the expected shape.
    InvalidResponse,
    /// Upstream access is switched off for this process.
    Offline,
}

/// Structured upstream error. Never reaches consumers of the read API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            kind: ProviderErrorKind::Offline,
            message: String::from("upstream access disabled"),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::Timeout => "provider.timeout",
            ProviderErrorKind::InvalidResponse => "provider.invalid_response",
            ProviderErrorKind::Offline => "provider.offline",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// One upstream quote row, before it is normalized into a [`crate::Quote`].
///
/// Only `symbol` and `price` are guaranteed; everything else is whatever the
/// upstream chose to send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuote {
    pub symbol: Option<Symbol>,
    pub name: Option<String>,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<u64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    /// Fraction, e.g. `0.0125` for 1.25%.
    pub dividend_yield: Option<f64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub avg_volume: Option<u64>,
    pub beta: Option<f64>,
}

impl RawQuote {
    pub fn new(symbol: Symbol, price: f64) -> Self {
        Self {
            symbol: Some(symbol),
            price,
            ..Self::default()
        }
    }

    /// A row is usable only when it names a symbol and carries a positive price.
    pub fn is_usable(&self) -> bool {
        self.symbol.is_some() && self.price.is_finite() && self.price > 0.0
    }
}

/// Upstream quote/history capability.
///
/// Implementations must be `Send + Sync`; the orchestrator shares one
/// instance across the scheduler's timers.
pub trait QuoteProvider: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Rows for whichever of `symbols` the upstream returned. Missing symbols
    /// are not an error.
    fn batch_quote<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawQuote>, ProviderError>> + Send + 'a>>;

    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        interval: Interval,
        range: HistoryRange,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>>;
}

/// Provider that refuses every call; the service then serves synthetic data only.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineProvider;

impl QuoteProvider for OfflineProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn batch_quote<'a>(
        &'a self,
        _symbols: &'a [Symbol],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawQuote>, ProviderError>> + Send + 'a>> {
        Box::pin(async { Err(ProviderError::offline()) })
    }

    fn history<'a>(
        &'a self,
        _symbol: &'a Symbol,
        _interval: Interval,
        _range: HistoryRange,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>> {
        Box::pin(async { Err(ProviderError::offline()) })
    }
}
