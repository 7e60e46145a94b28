//! Consumer-facing read API.

use std::sync::Arc;

use tracing::info;

use crate::adapters::YahooAdapter;
use crate::calendar::{MarketCalendar, SessionStatus};
use crate::clock::{Clock, SystemClock};
use crate::closing_cache::ClosingPriceCache;
use crate::config::ServiceConfig;
use crate::http_client::ReqwestHttpClient;
use crate::orchestrator::QuoteOrchestrator;
use crate::provider::{OfflineProvider, QuoteProvider};
use crate::{BarSeries, HistoryRange, Interval, Quote, SessionPhase, Symbol, UtcDateTime};

/// Composition root: owns the orchestrator, the closing snapshot and the basket.
pub struct MarketDataService {
    orchestrator: QuoteOrchestrator,
    universe: Vec<Symbol>,
}

impl MarketDataService {
    pub fn new(orchestrator: QuoteOrchestrator, universe: Vec<Symbol>) -> Self {
        Self {
            orchestrator,
            universe,
        }
    }

    /// Production wiring: Yahoo over reqwest (or no upstream when offline),
    /// NSE calendar, system clock and a fresh closing snapshot.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let provider: Arc<dyn QuoteProvider> = if config.offline {
            Arc::new(OfflineProvider)
        } else {
            Arc::new(YahooAdapter::new(
                config.yahoo(),
                Arc::new(ReqwestHttpClient::new()),
            ))
        };
        info!(
            provider = provider.name(),
            symbols = config.universe.len(),
            "market data service ready"
        );

        Self::with_parts(provider, Arc::new(SystemClock), config)
    }

    /// Wiring with an explicit provider and clock, NSE calendar.
    pub fn with_parts(
        provider: Arc<dyn QuoteProvider>,
        clock: Arc<dyn Clock>,
        config: &ServiceConfig,
    ) -> Self {
        let orchestrator = QuoteOrchestrator::new(
            provider,
            Arc::new(MarketCalendar::default()),
            ClosingPriceCache::new(),
            clock,
            config.fetch_policy(),
        );
        Self::new(orchestrator, config.universe.clone())
    }

    pub fn orchestrator(&self) -> &QuoteOrchestrator {
        &self.orchestrator
    }

    pub fn universe(&self) -> &[Symbol] {
        &self.universe
    }

    pub fn cache(&self) -> &ClosingPriceCache {
        self.orchestrator.cache()
    }

    pub fn calendar(&self) -> &MarketCalendar {
        self.orchestrator.calendar()
    }

    pub fn now(&self) -> UtcDateTime {
        self.orchestrator.clock().now()
    }

    pub fn phase(&self) -> SessionPhase {
        self.calendar().resolve_phase(self.now())
    }

    /// First `count` symbols of the basket.
    pub async fn get_top_quotes(&self, count: usize, force_live: bool) -> Vec<Quote> {
        let count = count.min(self.universe.len());
        self.orchestrator
            .fetch_quotes(&self.universe[..count], force_live)
            .await
    }

    pub async fn get_all_quotes(&self) -> Vec<Quote> {
        self.orchestrator.fetch_quotes(&self.universe, false).await
    }

    /// Live refresh of the whole basket, skipping the reuse window.
    pub async fn refresh_all_quotes(&self) -> Vec<Quote> {
        self.orchestrator.fetch_quotes(&self.universe, true).await
    }

    pub async fn get_quote(&self, symbol: &Symbol) -> Quote {
        self.orchestrator.fetch_quote(symbol).await
    }

    pub fn get_session_status(&self) -> SessionStatus {
        self.calendar().status(self.now())
    }

    pub async fn has_closing_snapshot(&self) -> bool {
        self.cache().has_capture().await
    }

    /// Case-insensitive substring match on symbol or name over the basket.
    pub async fn search(&self, query: &str) -> Vec<Quote> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.get_all_quotes()
            .await
            .into_iter()
            .filter(|quote| {
                quote.symbol.as_str().to_lowercase().contains(&needle)
                    || quote.name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub async fn history(
        &self,
        symbol: &Symbol,
        interval: Interval,
        range: HistoryRange,
    ) -> BarSeries {
        self.orchestrator.fetch_history(symbol, interval, range).await
    }
}
