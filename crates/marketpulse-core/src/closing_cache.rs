//! Once-per-day closing price snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use time::Date;
use tracing::{debug, info};

use crate::{Quote, Symbol, UtcDateTime};

#[derive(Debug, Clone)]
struct ClosingSnapshot {
    trading_date: Date,
    captured_at: UtcDateTime,
    quotes: HashMap<Symbol, Quote>,
}

/// Process-wide store of the quotes frozen at session end.
///
/// Lifecycle: empty at construction, populated by the first successful
/// [`capture`](Self::capture), read-only until [`clear`](Self::clear).
/// Clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClosingPriceCache {
    inner: Arc<tokio::sync::RwLock<Option<ClosingSnapshot>>>,
}

impl ClosingPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes `quotes` as the closing prices of `trading_date`.
    ///
    /// First writer wins per trading day: returns `false` and leaves the store
    /// untouched when `quotes` is empty or a snapshot for the same or a later
    /// day exists. A snapshot left over from an earlier day is replaced.
    pub async fn capture(&self, quotes: &[Quote], trading_date: Date, now: UtcDateTime) -> bool {
        if quotes.is_empty() {
            debug!("ignoring closing capture with no quotes");
            return false;
        }

        let mut store = self.inner.write().await;
        if let Some(existing) = store.as_ref() {
            if existing.trading_date >= trading_date {
                debug!(
                    trading_date = %existing.trading_date,
                    "closing snapshot already captured"
                );
                return false;
            }
            info!(
                stale = %existing.trading_date,
                "replacing closing snapshot from an earlier day"
            );
        }

        let quotes = quotes
            .iter()
            .map(|quote| (quote.symbol.clone(), quote.as_closing_price(now)))
            .collect::<HashMap<_, _>>();
        info!(
            %trading_date,
            symbols = quotes.len(),
            "captured closing prices"
        );
        *store = Some(ClosingSnapshot {
            trading_date,
            captured_at: now,
            quotes,
        });
        true
    }

    /// Snapshot entries for `symbols`, in order; `None` where the symbol was not captured.
    pub async fn get(&self, symbols: &[Symbol]) -> Vec<Option<Quote>> {
        let store = self.inner.read().await;
        symbols
            .iter()
            .map(|symbol| {
                store
                    .as_ref()
                    .and_then(|snapshot| snapshot.quotes.get(symbol))
                    .cloned()
            })
            .collect()
    }

    /// Every captured quote, sorted by symbol.
    pub async fn snapshot(&self) -> Vec<Quote> {
        let store = self.inner.read().await;
        let mut quotes = store
            .as_ref()
            .map(|snapshot| snapshot.quotes.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        quotes.sort_by(|a, b| a.symbol.as_str().cmp(b.symbol.as_str()));
        quotes
    }

    pub async fn has_capture(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// True when the stored snapshot belongs to `trading_date`.
    pub async fn has_capture_for(&self, trading_date: Date) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .is_some_and(|snapshot| snapshot.trading_date == trading_date)
    }

    pub async fn captured_at(&self) -> Option<UtcDateTime> {
        self.inner.read().await.as_ref().map(|snapshot| snapshot.captured_at)
    }

    pub async fn trading_date(&self) -> Option<Date> {
        self.inner.read().await.as_ref().map(|snapshot| snapshot.trading_date)
    }

    /// Drops the snapshot so the next close can be captured.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        if store.take().is_some() {
            info!("cleared closing price snapshot");
        }
    }
}
