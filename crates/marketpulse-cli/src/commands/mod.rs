mod history;
mod quotes;
mod status;
mod watch;

use std::sync::Arc;
use std::time::{Duration, Instant};

use marketpulse_core::{MarketDataService, Quote, ServiceConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{self, Envelope, Meta};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Ok result for a quote list, warning when some entries are synthetic.
    pub fn quotes(quotes: &[Quote]) -> Result<Self, CliError> {
        let synthetic = quotes.iter().filter(|quote| !quote.is_real_data).count();
        let result = Self::ok(serde_json::to_value(quotes)?);
        Ok(if synthetic > 0 {
            result.with_warning(format!(
                "{synthetic} of {} quotes are synthetic",
                quotes.len()
            ))
        } else {
            result
        })
    }
}

pub fn build_config(cli: &Cli) -> Result<ServiceConfig, CliError> {
    let mut config = ServiceConfig::from_env()?;

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(batch_delay_ms) = cli.batch_delay_ms {
        config.batch_delay = Duration::from_millis(batch_delay_ms);
    }
    config.offline |= cli.offline;

    config.validate()?;
    Ok(config)
}

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = build_config(cli)?;
    let service = Arc::new(MarketDataService::from_config(&config));

    if let Command::Watch(args) = &cli.command {
        return watch::run(args, service, &config, cli.pretty).await;
    }
    let envelope = execute(cli, &service).await?;
    output::render(&envelope, cli.pretty)
}

/// Runs a one-shot command and wraps its result in the `{meta, data}` envelope.
pub async fn execute(cli: &Cli, service: &MarketDataService) -> Result<Envelope, CliError> {
    let started = Instant::now();
    let (name, result) = match &cli.command {
        Command::Status => ("status", status::run(service).await?),
        Command::Top(args) => ("top", quotes::top(args, service).await?),
        Command::Quotes => ("quotes", quotes::all(service).await?),
        Command::Quote(args) => ("quote", quotes::one(args, service).await?),
        Command::History(args) => ("history", history::run(args, service).await?),
        Command::Search(args) => ("search", quotes::search(args, service).await?),
        Command::Watch(_) => {
            return Err(CliError::Command(String::from("watch streams and has no single envelope")));
        }
    };

    Ok(Envelope {
        meta: Meta {
            command: name,
            generated_at: service.now(),
            market_status: service.phase(),
            closing_snapshot: service.has_closing_snapshot().await,
            latency_ms: started.elapsed().as_millis() as u64,
            warnings: result.warnings,
        },
        data: result.data,
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::Value;

    use super::*;

    async fn journey(args: &[&str]) -> Value {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("parses");
        let config = build_config(&cli).expect("valid config");
        let service = MarketDataService::from_config(&config);
        let envelope = execute(&cli, &service).await.expect("command succeeds");
        serde_json::to_value(&envelope).expect("serializes")
    }

    // =========================================================================
    // Offline user journeys
    // =========================================================================

    #[tokio::test]
    async fn offline_status_prints_the_phase_in_meta_and_data() {
        // Given / When: the user asks for the session status without network
        let output = journey(&["marketpulse", "--offline", "status"]).await;

        // Then: one envelope with meta and data, both naming the same phase
        assert_eq!(output["meta"]["command"], "status");
        assert!(output["meta"]["market_status"].is_string());
        assert!(output["meta"]["generated_at"].is_string());
        assert!(output["data"]["headline"].is_string());
        assert_eq!(output["data"]["phase"], output["meta"]["market_status"]);
    }

    #[tokio::test]
    async fn offline_top_returns_the_requested_count_of_synthetic_quotes() {
        // Given / When
        let output = journey(&[
            "marketpulse",
            "--offline",
            "--batch-delay-ms",
            "0",
            "top",
            "--count",
            "3",
        ])
        .await;

        // Then: three quotes, all flagged synthetic, with a warning saying so
        assert_eq!(output["meta"]["command"], "top");
        let data = output["data"].as_array().expect("quote list");
        assert_eq!(data.len(), 3);
        assert!(data.iter().all(|quote| quote["is_real_data"] == false));
        assert!(data.iter().all(|quote| quote["price"].as_f64().is_some_and(|p| p > 0.0)));
        assert_eq!(output["meta"]["warnings"][0], "3 of 3 quotes are synthetic");
    }

    #[tokio::test]
    async fn offline_search_without_matches_warns_and_returns_an_empty_list() {
        let output = journey(&[
            "marketpulse",
            "--offline",
            "--batch-delay-ms",
            "0",
            "search",
            "zzzz-no-such-name",
        ])
        .await;

        assert_eq!(output["meta"]["command"], "search");
        assert_eq!(output["data"], Value::Array(Vec::new()));
        assert_eq!(
            output["meta"]["warnings"][0],
            "no instruments match 'zzzz-no-such-name'"
        );
    }

    #[tokio::test]
    async fn zero_count_is_a_command_error() {
        let cli = Cli::try_parse_from(["marketpulse", "--offline", "top", "--count", "0"])
            .expect("parses");
        let config = build_config(&cli).expect("valid config");
        let service = MarketDataService::from_config(&config);

        let error = execute(&cli, &service).await.expect_err("rejected");
        assert!(matches!(error, CliError::Command(_)));
    }
}
