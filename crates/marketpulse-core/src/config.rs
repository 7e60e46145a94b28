use std::time::Duration;

use crate::adapters::yahoo::{YahooConfig, DEFAULT_BASE_URL};
use crate::orchestrator::FetchPolicy;
use crate::scheduler::ScheduleConfig;
use crate::{synthetic, Symbol, ValidationError};

/// Runtime settings for the service, its upstream adapter and the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub reuse_window: Duration,
    /// Basket shown by `get_all_quotes`, in display order.
    pub universe: Vec<Symbol>,
    pub schedule: ScheduleConfig,
    /// Serve synthetic data only and never call the upstream.
    pub offline: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let fetch = FetchPolicy::default();
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key: None,
            request_timeout: fetch.request_timeout,
            batch_size: fetch.batch_size,
            batch_delay: fetch.batch_delay,
            reuse_window: fetch.reuse_window,
            universe: synthetic::universe_symbols(),
            schedule: ScheduleConfig::default(),
            offline: false,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `MARKETPULSE_*` environment variables.
    ///
    /// The API key falls back to `YFAPI_KEY`.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(base_url) = get("MARKETPULSE_BASE_URL") {
            config.base_url = base_url.trim().to_owned();
        }
        config.api_key = get("MARKETPULSE_API_KEY").or_else(|| get("YFAPI_KEY"));

        if let Some(value) = get("MARKETPULSE_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(parse_number("MARKETPULSE_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = get("MARKETPULSE_BATCH_SIZE") {
            config.batch_size = parse_number("MARKETPULSE_BATCH_SIZE", &value)? as usize;
        }
        if let Some(value) = get("MARKETPULSE_BATCH_DELAY_MS") {
            config.batch_delay = Duration::from_millis(parse_number("MARKETPULSE_BATCH_DELAY_MS", &value)?);
        }
        if let Some(value) = get("MARKETPULSE_REUSE_WINDOW_SECS") {
            config.reuse_window = Duration::from_secs(parse_number("MARKETPULSE_REUSE_WINDOW_SECS", &value)?);
        }
        if let Some(value) = get("MARKETPULSE_SYMBOLS") {
            config.universe = parse_symbols(&value)?;
        }
        if let Some(value) = get("MARKETPULSE_OFFLINE") {
            config.offline = parse_flag("MARKETPULSE_OFFLINE", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("request_timeout", "must be greater than zero"));
        }
        if self.universe.is_empty() {
            return Err(invalid("universe", "must contain at least one symbol"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(invalid("base_url", "must be an http(s) URL"));
        }
        self.schedule.validate()
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay,
            request_timeout: self.request_timeout,
            reuse_window: self.reuse_window,
        }
    }

    pub fn yahoo(&self) -> YahooConfig {
        let timeout_ms = self.request_timeout.as_millis() as u64;
        YahooConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            batch_timeout_ms: timeout_ms,
            single_timeout_ms: timeout_ms.min(YahooConfig::default().single_timeout_ms),
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig {
        key,
        reason: reason.into(),
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ValidationError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(key, format!("'{value}' is not a non-negative integer")))
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(key, format!("'{other}' is not a boolean"))),
    }
}

fn parse_symbols(value: &str) -> Result<Vec<Symbol>, ValidationError> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for part in value.split(',').filter(|part| !part.trim().is_empty()) {
        let symbol = Symbol::parse(part.trim())?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_basket_and_cadences() {
        let config = ServiceConfig::from_lookup(lookup(&[])).expect("defaults are valid");

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.batch_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.universe.len(), 20);
        assert_eq!(config.schedule.tick, Duration::from_secs(1));
        assert_eq!(config.schedule.refresh_closed, Duration::from_secs(300));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn environment_overrides_and_key_fallback() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("YFAPI_KEY", "fallback-key"),
            ("MARKETPULSE_BATCH_SIZE", "3"),
            ("MARKETPULSE_BATCH_DELAY_MS", "0"),
            ("MARKETPULSE_SYMBOLS", "tcs.ns, INFY,TCS"),
            ("MARKETPULSE_OFFLINE", "yes"),
        ]))
        .expect("valid");

        assert_eq!(config.api_key.as_deref(), Some("fallback-key"));
        assert_eq!(config.batch_size, 3);
        assert!(config.batch_delay.is_zero());
        assert_eq!(
            config.universe.iter().map(Symbol::as_str).collect::<Vec<_>>(),
            vec!["TCS", "INFY"]
        );
        assert!(config.offline);
    }

    #[test]
    fn rejects_bad_numbers_and_zero_batches() {
        let error = ServiceConfig::from_lookup(lookup(&[("MARKETPULSE_TIMEOUT_MS", "soon")]))
            .expect_err("must fail");
        assert!(matches!(
            error,
            ValidationError::InvalidConfig { key: "MARKETPULSE_TIMEOUT_MS", .. }
        ));

        let error = ServiceConfig::from_lookup(lookup(&[("MARKETPULSE_BATCH_SIZE", "0")]))
            .expect_err("must fail");
        assert!(matches!(error, ValidationError::InvalidConfig { key: "batch_size", .. }));
    }

    #[test]
    fn yahoo_config_caps_single_timeout() {
        let config = ServiceConfig {
            request_timeout: Duration::from_secs(20),
            ..ServiceConfig::default()
        };

        let yahoo = config.yahoo();
        assert_eq!(yahoo.batch_timeout_ms, 20_000);
        assert_eq!(yahoo.single_timeout_ms, 8_000);
    }
}
