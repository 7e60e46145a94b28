//! Quote fetch orchestrator.
//!
//! Merges upstream rows with synthetic fallback so every call returns exactly
//! one quote per requested symbol, in request order, and freezes the day's
//! closing prices the first time it runs after the session has ended.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::calendar::MarketCalendar;
use crate::clock::Clock;
use crate::closing_cache::ClosingPriceCache;
use crate::provider::{QuoteProvider, RawQuote};
use crate::throttling::BatchThrottle;
use crate::{
    change_percent, format_market_cap, synthetic, BarSeries, HistoryRange, Interval, Quote,
    SessionPhase, Symbol, UtcDateTime,
};

/// Batching, pacing and reuse knobs for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub request_timeout: Duration,
    /// A non-forced fetch may reuse the previous merge when it is younger than this.
    pub reuse_window: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            reuse_window: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct RecentFetch {
    fetched_at: UtcDateTime,
    phase: SessionPhase,
    quotes: HashMap<Symbol, Quote>,
}

pub struct QuoteOrchestrator {
    provider: Arc<dyn QuoteProvider>,
    calendar: Arc<MarketCalendar>,
    cache: ClosingPriceCache,
    clock: Arc<dyn Clock>,
    policy: FetchPolicy,
    throttle: BatchThrottle,
    rng: Mutex<fastrand::Rng>,
    recent: tokio::sync::Mutex<Option<RecentFetch>>,
}

impl QuoteOrchestrator {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        calendar: Arc<MarketCalendar>,
        cache: ClosingPriceCache,
        clock: Arc<dyn Clock>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            provider,
            calendar,
            cache,
            clock,
            throttle: BatchThrottle::new(policy.batch_delay),
            policy: FetchPolicy {
                batch_size: policy.batch_size.max(1),
                ..policy
            },
            rng: Mutex::new(fastrand::Rng::new()),
            recent: tokio::sync::Mutex::new(None),
        }
    }

    /// Seeds the generator used for synthetic fill-in.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            ..self
        }
    }

    pub fn calendar(&self) -> &MarketCalendar {
        &self.calendar
    }

    pub fn cache(&self) -> &ClosingPriceCache {
        &self.cache
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// One quote per entry of `symbols`, in order. Never fails.
    ///
    /// Once the session is closed for the day and the snapshot for today's
    /// trading date exists, the snapshot is served without touching the
    /// upstream, whatever `force_live` says. Otherwise `force_live` only
    /// bypasses the reuse window, which never spans a phase change or a
    /// pending capture.
    pub async fn fetch_quotes(&self, symbols: &[Symbol], force_live: bool) -> Vec<Quote> {
        self.fetch(symbols, force_live, true).await
    }

    /// Detail lookup for one symbol. Same sourcing rules as
    /// [`fetch_quotes`](Self::fetch_quotes) but never captures the closing snapshot.
    pub async fn fetch_quote(&self, symbol: &Symbol) -> Quote {
        let mut quotes = self.fetch(std::slice::from_ref(symbol), false, false).await;
        match quotes.pop() {
            Some(quote) => quote,
            None => self.synthesize(symbol, self.calendar.resolve_phase(self.clock.now())),
        }
    }

    /// Upstream bars, or a synthetic walk when the upstream cannot answer.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: Interval,
        range: HistoryRange,
    ) -> BarSeries {
        let outcome = tokio::time::timeout(
            self.policy.request_timeout,
            self.provider.history(symbol, interval, range),
        )
        .await;

        match outcome {
            Ok(Ok(series)) if !series.bars.is_empty() => series,
            Ok(Ok(_)) => {
                warn!(%symbol, "upstream returned no bars, generating synthetic history");
                self.synthetic_history(symbol)
            }
            Ok(Err(error)) => {
                warn!(%symbol, %error, "history fetch failed, generating synthetic history");
                self.synthetic_history(symbol)
            }
            Err(_) => {
                warn!(%symbol, "history fetch timed out, generating synthetic history");
                self.synthetic_history(symbol)
            }
        }
    }

    async fn fetch(&self, symbols: &[Symbol], force_live: bool, allow_capture: bool) -> Vec<Quote> {
        if symbols.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let phase = self.calendar.resolve_phase(now);
        let closed_for_day = self.calendar.is_closed_for_day(now);

        let trading_date = self.calendar.trading_date(now);
        let captured_today = self.cache.has_capture_for(trading_date).await;

        if closed_for_day && captured_today {
            debug!(symbols = symbols.len(), "serving closing snapshot");
            return self.from_snapshot(symbols, phase).await;
        }

        // A pending capture must see fresh upstream data, never the memo.
        let capture_pending = closed_for_day && !captured_today;
        if !force_live && !capture_pending {
            if let Some(quotes) = self.reuse_recent(symbols, phase, now).await {
                debug!(symbols = symbols.len(), "reusing recent quotes");
                return quotes;
            }
        }

        let rows = self.fetch_upstream(symbols).await;
        let merged = self.merge(symbols, rows, phase, now);

        if allow_capture && closed_for_day {
            self.cache.capture(&merged, trading_date, now).await;
        }
        if allow_capture {
            self.remember(&merged, phase, now).await;
        }

        merged
    }

    async fn from_snapshot(&self, symbols: &[Symbol], phase: SessionPhase) -> Vec<Quote> {
        let cached = self.cache.get(symbols).await;
        symbols
            .iter()
            .zip(cached)
            .map(|(symbol, quote)| quote.unwrap_or_else(|| self.synthesize(symbol, phase)))
            .collect()
    }

    /// Memoized quotes, only while still inside the window and the same phase.
    async fn reuse_recent(
        &self,
        symbols: &[Symbol],
        phase: SessionPhase,
        now: UtcDateTime,
    ) -> Option<Vec<Quote>> {
        let recent = self.recent.lock().await;
        let recent = recent.as_ref().filter(|recent| recent.phase == phase)?;

        let age = now.unix_timestamp() - recent.fetched_at.unix_timestamp();
        if age < 0 || age as u64 >= self.policy.reuse_window.as_secs() {
            return None;
        }

        symbols
            .iter()
            .map(|symbol| recent.quotes.get(symbol).cloned())
            .collect()
    }

    async fn remember(&self, quotes: &[Quote], phase: SessionPhase, now: UtcDateTime) {
        let mut recent = self.recent.lock().await;
        *recent = Some(RecentFetch {
            fetched_at: now,
            phase,
            quotes: quotes
                .iter()
                .map(|quote| (quote.symbol.clone(), quote.clone()))
                .collect(),
        });
    }

    /// Issues one paced, time-bounded call per batch. Failed batches contribute nothing.
    async fn fetch_upstream(&self, symbols: &[Symbol]) -> HashMap<Symbol, RawQuote> {
        let batches = symbols.chunks(self.policy.batch_size).count();
        info!(
            provider = self.provider.name(),
            symbols = symbols.len(),
            batches,
            "fetching quotes"
        );

        let mut rows = HashMap::with_capacity(symbols.len());
        for (index, batch) in symbols.chunks(self.policy.batch_size).enumerate() {
            self.throttle.acquire().await;
            debug!(batch = index, size = batch.len(), "issuing quote batch");

            let outcome =
                tokio::time::timeout(self.policy.request_timeout, self.provider.batch_quote(batch))
                    .await;
            match outcome {
                Ok(Ok(batch_rows)) => {
                    for row in batch_rows.into_iter().filter(RawQuote::is_usable) {
                        if let Some(symbol) = row.symbol.clone() {
                            rows.insert(symbol, row);
                        }
                    }
                }
                Ok(Err(error)) => {
                    warn!(batch = index, code = error.code(), %error, "quote batch failed");
                }
                Err(_) => {
                    warn!(
                        batch = index,
                        timeout_ms = self.policy.request_timeout.as_millis() as u64,
                        "quote batch timed out"
                    );
                }
            }
        }
        rows
    }

    fn merge(
        &self,
        symbols: &[Symbol],
        mut rows: HashMap<Symbol, RawQuote>,
        phase: SessionPhase,
        now: UtcDateTime,
    ) -> Vec<Quote> {
        let mut synthesized = 0usize;
        let quotes = symbols
            .iter()
            .map(|symbol| {
                let real = rows
                    .remove(symbol)
                    .and_then(|row| quote_from_raw(symbol, row, phase, now));
                real.unwrap_or_else(|| {
                    synthesized += 1;
                    self.synthesize(symbol, phase)
                })
            })
            .collect::<Vec<_>>();

        if synthesized > 0 {
            info!(
                real = quotes.len() - synthesized,
                synthetic = synthesized,
                "filled missing quotes with synthetic data"
            );
        }
        quotes
    }

    fn synthesize(&self, symbol: &Symbol, phase: SessionPhase) -> Quote {
        let now = self.clock.now();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        synthetic::synthesize(symbol, phase, now, &mut rng)
    }

    fn synthetic_history(&self, symbol: &Symbol) -> BarSeries {
        let now = self.clock.now();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        synthetic::synthesize_history(symbol, now, &mut rng)
    }
}

/// Normalizes an upstream row. `None` when the row cannot form a valid quote.
fn quote_from_raw(
    symbol: &Symbol,
    raw: RawQuote,
    phase: SessionPhase,
    now: UtcDateTime,
) -> Option<Quote> {
    let price = raw.price;
    let positive = |value: Option<f64>| value.filter(|v| v.is_finite() && *v > 0.0);

    let (change, previous_close) = match (raw.change, positive(raw.previous_close)) {
        (Some(change), Some(previous_close)) => (change, previous_close),
        (Some(change), None) => (change, price - change),
        (None, Some(previous_close)) => (price - previous_close, previous_close),
        (None, None) => (0.0, price),
    };

    let quote = Quote {
        symbol: symbol.clone(),
        name: raw.name.unwrap_or_else(|| synthetic::display_name(symbol)),
        price,
        change,
        change_percent: raw
            .change_percent
            .unwrap_or_else(|| change_percent(change, previous_close)),
        open: positive(raw.open).unwrap_or(price),
        high: positive(raw.high).unwrap_or(price),
        low: positive(raw.low).unwrap_or(price),
        previous_close,
        volume: raw.volume.unwrap_or(0),
        sector: synthetic::sector_of(symbol).to_owned(),
        market_cap: format_market_cap(raw.market_cap),
        pe_ratio: raw.pe_ratio,
        dividend_yield: raw.dividend_yield.map(|fraction| fraction * 100.0),
        year_high: raw.year_high,
        year_low: raw.year_low,
        avg_volume: raw.avg_volume,
        beta: raw.beta,
        last_updated: now,
        is_real_data: true,
        market_status: phase,
        is_closing_price: false,
        stored_at: None,
    };

    match quote.validate() {
        Ok(()) => Some(quote),
        Err(error) => {
            warn!(%symbol, %error, "discarding inconsistent upstream quote");
            None
        }
    }
}
