use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::provider::{ProviderError, QuoteProvider, RawQuote};
use crate::{Bar, BarSeries, HistoryRange, Interval, Symbol, UtcDateTime};

pub const DEFAULT_BASE_URL: &str = "https://yfapi.net";

/// Connection settings for the yfapi.net REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YahooConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Budget for multi-symbol quote calls.
    pub batch_timeout_ms: u64,
    /// Budget for single-symbol quote and chart calls.
    pub single_timeout_ms: u64,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key: None,
            batch_timeout_ms: 10_000,
            single_timeout_ms: 8_000,
        }
    }
}

/// Quote and chart adapter for the yfapi.net Yahoo Finance mirror.
#[derive(Clone)]
pub struct YahooAdapter {
    config: YahooConfig,
    auth: HttpAuth,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooAdapter {
    pub fn new(config: YahooConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let auth = HttpAuth::api_key(config.api_key.as_deref());
        Self {
            config,
            auth,
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "yahoo",
                CircuitBreakerConfig::default(),
            )),
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn quote_url(&self, symbols: &[Symbol]) -> String {
        let listings = symbols
            .iter()
            .map(Symbol::listing)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/v6/finance/quote?symbols={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&listings)
        )
    }

    fn chart_url(&self, symbol: &Symbol, interval: Interval, range: HistoryRange) -> String {
        format!(
            "{}/v8/finance/chart/{}?interval={}&range={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&symbol.listing()),
            interval.as_str(),
            range.as_str()
        )
    }

    /// Runs one GET through the circuit breaker and returns the 2xx body.
    async fn fetch(&self, url: String, timeout_ms: u64) -> Result<String, ProviderError> {
        if !self.circuit_breaker.allow_request() {
            return Err(ProviderError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        debug!(%url, timeout_ms, "yahoo request");
        let request = HttpRequest::get(url)
            .with_header("content-type", "application/json")
            .with_auth(&self.auth)
            .with_timeout_ms(timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| {
                self.circuit_breaker.record_failure();
                transport_error(&error)
            })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(status_error(&response));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }
}

impl QuoteProvider for YahooAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn batch_quote<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawQuote>, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            if symbols.is_empty() {
                return Ok(Vec::new());
            }

            let timeout_ms = if symbols.len() == 1 {
                self.config.single_timeout_ms
            } else {
                self.config.batch_timeout_ms
            };
            let body = self.fetch(self.quote_url(symbols), timeout_ms).await?;
            parse_quote_response(&body)
        })
    }

    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        interval: Interval,
        range: HistoryRange,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.chart_url(symbol, interval, range);
            let body = self.fetch(url, self.config.single_timeout_ms).await?;
            parse_chart_response(symbol, &body)
        })
    }
}

fn transport_error(error: &HttpError) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(format!("yahoo request timed out: {}", error.message()))
    } else {
        ProviderError::unavailable(format!("yahoo transport error: {}", error.message()))
    }
}

fn status_error(response: &HttpResponse) -> ProviderError {
    match response.status {
        429 => ProviderError::rate_limited("yahoo returned status 429"),
        status => ProviderError::unavailable(format!("yahoo returned status {status}")),
    }
}

fn parse_quote_response(body: &str) -> Result<Vec<RawQuote>, ProviderError> {
    let response: YahooQuoteResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse yahoo quote response: {e}"))
    })?;

    let data = response
        .quote_response
        .ok_or_else(|| ProviderError::invalid_response("yahoo response has no quoteResponse"))?;

    if let Some(error) = data.error.filter(|error| !error.is_null()) {
        return Err(ProviderError::unavailable(format!("yahoo API error: {error}")));
    }

    let rows = data
        .result
        .ok_or_else(|| ProviderError::invalid_response("yahoo response has no result array"))?;

    // Rows are decoded one by one so a malformed row only costs its own symbol.
    Ok(rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<YahooQuoteData>(row) {
            Ok(data) => data.into_raw(),
            Err(error) => {
                debug!(%error, "dropping malformed yahoo quote row");
                None
            }
        })
        .filter(RawQuote::is_usable)
        .collect())
}

fn parse_chart_response(symbol: &Symbol, body: &str) -> Result<BarSeries, ProviderError> {
    let response: YahooChartResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse yahoo chart: {e}"))
    })?;

    if let Some(error) = response.chart.error.filter(|error| !error.is_null()) {
        return Err(ProviderError::unavailable(format!("yahoo chart API error: {error}")));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::invalid_response("no chart data in response"))?;
    let timestamps = result
        .timestamp
        .ok_or_else(|| ProviderError::invalid_response("no timestamp data"))?;
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::invalid_response("no quote data"))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts_value) in timestamps.iter().enumerate() {
        let Ok(ts) = UtcDateTime::from_unix_timestamp(ts_value) else {
            continue;
        };
        let value = |series: &[Option<f64>]| series.get(i).copied().flatten();

        if let (Some(open), Some(high), Some(low), Some(close)) = (
            value(&quote.open),
            value(&quote.high),
            value(&quote.low),
            value(&quote.close),
        ) {
            let volume = to_count(value(&quote.volume)).unwrap_or(0);
            // Bar::new rejects non-positive or inconsistent rows.
            if let Ok(bar) = Bar::new(ts, open, high, low, close, volume) {
                bars.push(bar);
            }
        }
    }

    if bars.is_empty() {
        return Err(ProviderError::invalid_response("no valid historical bars"));
    }

    Ok(BarSeries {
        symbol: symbol.clone(),
        bars,
        is_real_data: true,
    })
}

fn to_count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: Option<YahooQuoteResponseData>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponseData {
    result: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteData {
    symbol: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_open: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
    market_cap: Option<f64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    dividend_yield: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    average_volume: Option<f64>,
    beta: Option<f64>,
}

impl YahooQuoteData {
    fn into_raw(self) -> Option<RawQuote> {
        let symbol = Symbol::parse(self.symbol.as_deref()?).ok()?;
        let price = self.regular_market_price?;

        Some(RawQuote {
            symbol: Some(symbol),
            name: self.long_name.or(self.short_name),
            price,
            change: self.regular_market_change,
            change_percent: self.regular_market_change_percent,
            open: self.regular_market_open,
            high: self.regular_market_day_high,
            low: self.regular_market_day_low,
            previous_close: self.regular_market_previous_close,
            volume: to_count(self.regular_market_volume),
            market_cap: self.market_cap,
            pe_ratio: self.trailing_pe,
            dividend_yield: self.dividend_yield,
            year_high: self.fifty_two_week_high,
            year_low: self.fifty_two_week_low,
            avg_volume: to_count(self.average_volume),
            beta: self.beta,
        })
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::provider::ProviderErrorKind;

    struct ScriptedHttpClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().expect("lock").clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.seen.lock().expect("lock").push(request);
            let next = {
                let mut responses = self.responses.lock().expect("lock");
                if responses.is_empty() {
                    Err(HttpError::new("script exhausted"))
                } else {
                    responses.remove(0)
                }
            };
            Box::pin(async move { next })
        }
    }

    fn adapter(client: Arc<ScriptedHttpClient>) -> YahooAdapter {
        YahooAdapter::new(
            YahooConfig {
                base_url: String::from("https://yfapi.test/"),
                api_key: Some(String::from("secret")),
                ..YahooConfig::default()
            },
            client,
        )
    }

    fn symbols(values: &[&str]) -> Vec<Symbol> {
        values
            .iter()
            .map(|value| Symbol::parse(value).expect("valid"))
            .collect()
    }

    #[tokio::test]
    async fn quote_request_uses_listing_suffix_and_api_key() {
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"quoteResponse":{"result":[],"error":null}}"#,
        ))]);
        let adapter = adapter(client.clone());

        let rows = adapter
            .batch_quote(&symbols(&["RELIANCE", "TCS"]))
            .await
            .expect("empty result is fine");

        assert!(rows.is_empty());
        let request = &client.requests()[0];
        assert_eq!(
            request.url,
            "https://yfapi.test/v6/finance/quote?symbols=RELIANCE.NS%2CTCS.NS"
        );
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("secret"));
        assert_eq!(request.timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn rows_without_a_positive_price_are_dropped() {
        let body = r#"{"quoteResponse":{"result":[
            {"symbol":"INFY.NS","longName":"Infosys Limited","regularMarketPrice":1510.5,
             "regularMarketChange":4.7,"regularMarketPreviousClose":1505.8,
             "regularMarketVolume":1234567,"marketCap":6.2e12,"trailingPE":27.3,
             "dividendYield":0.0215,"fiftyTwoWeekHigh":1990.0,"fiftyTwoWeekLow":1350.0},
            {"symbol":"TCS.NS","regularMarketPrice":0},
            {"symbol":"WIPRO.NS"}
        ]}}"#;
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(body))]);

        let rows = adapter(client)
            .batch_quote(&symbols(&["INFY", "TCS", "WIPRO"]))
            .await
            .expect("parses");

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.symbol.as_ref().map(Symbol::as_str), Some("INFY"));
        assert_eq!(row.name.as_deref(), Some("Infosys Limited"));
        assert_eq!(row.volume, Some(1_234_567));
        assert_eq!(row.dividend_yield, Some(0.0215));
        assert_eq!(row.beta, None);
    }

    #[tokio::test]
    async fn a_mistyped_row_only_loses_its_own_symbol() {
        let body = r#"{"quoteResponse":{"result":[
            {"symbol":"INFY.NS","regularMarketPrice":1510.5,"beta":0.9},
            {"symbol":"TCS.NS","regularMarketPrice":3100.0,"beta":"N/A"},
            "not an object",
            {"symbol":"SBIN.NS","regularMarketPrice":812.25}
        ],"error":null}}"#;
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(body))]);

        let rows = adapter(client)
            .batch_quote(&symbols(&["INFY", "TCS", "SBIN"]))
            .await
            .expect("the batch survives a bad row");

        let returned = rows
            .iter()
            .filter_map(|row| row.symbol.as_ref().map(Symbol::as_str))
            .collect::<Vec<_>>();
        assert_eq!(returned, vec!["INFY", "SBIN"]);
        assert_eq!(rows[0].beta, Some(0.9));
    }

    #[tokio::test]
    async fn malformed_body_is_an_invalid_response() {
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json("<html>oops</html>"))]);

        let error = adapter(client)
            .batch_quote(&symbols(&["SBIN"]))
            .await
            .expect_err("must fail");

        assert_eq!(error.kind(), ProviderErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn status_and_transport_failures_are_classified() {
        let client = ScriptedHttpClient::new(vec![
            Ok(HttpResponse::with_status(429, "")),
            Ok(HttpResponse::with_status(503, "")),
            Err(HttpError::timeout("deadline")),
        ]);
        let adapter = adapter(client);
        let request = symbols(&["ITC"]);

        let kinds = [
            adapter.batch_quote(&request).await.expect_err("429").kind(),
            adapter.batch_quote(&request).await.expect_err("503").kind(),
            adapter.batch_quote(&request).await.expect_err("timeout").kind(),
        ];

        assert_eq!(
            kinds,
            [
                ProviderErrorKind::RateLimited,
                ProviderErrorKind::Unavailable,
                ProviderErrorKind::Timeout
            ]
        );
    }

    #[tokio::test]
    async fn open_circuit_skips_the_network() {
        let client = ScriptedHttpClient::new(Vec::new());
        let adapter = adapter(client.clone());
        let request = symbols(&["LT"]);

        for _ in 0..3 {
            let _ = adapter.batch_quote(&request).await;
        }
        let error = adapter.batch_quote(&request).await.expect_err("open");

        assert_eq!(client.requests().len(), 3);
        assert!(error.message().contains("circuit breaker is open"));
    }

    #[tokio::test]
    async fn chart_drops_non_positive_bars() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1754971200,1755057600,1755144000],
            "indicators":{"quote":[{
                "open":[100.0,0.0,102.0],
                "high":[105.0,104.0,106.0],
                "low":[99.0,98.0,101.0],
                "close":[104.0,101.0,null],
                "volume":[1000,2000,3000]
            }]}
        }],"error":null}}"#;
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(body))]);
        let adapter = adapter(client.clone());
        let symbol = Symbol::parse("HCLTECH").expect("valid");

        let series = adapter
            .history(&symbol, Interval::OneDay, HistoryRange::OneMonth)
            .await
            .expect("parses");

        assert!(series.is_real_data);
        assert_eq!(series.bars.len(), 1);
        assert_eq!(series.bars[0].close, 104.0);
        let request = &client.requests()[0];
        assert_eq!(
            request.url,
            "https://yfapi.test/v8/finance/chart/HCLTECH.NS?interval=1d&range=1mo"
        );
        assert_eq!(request.timeout_ms, 8_000);
    }
}
