//! CLI argument definitions for marketpulse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `status` | Current session phase and next open |
//! | `top` | First N quotes of the basket |
//! | `quotes` | Whole basket |
//! | `quote` | One symbol in detail |
//! | `history` | OHLCV bars for one symbol |
//! | `search` | Filter the basket by symbol or name |
//! | `watch` | Run the live scheduler for a while |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--base-url` | `https://yfapi.net` | Upstream base URL |
//! | `--api-key` | env | Upstream API key |
//! | `--timeout-ms` | `10000` | Per-batch request timeout |
//! | `--batch-size` | `5` | Symbols per upstream call |
//! | `--batch-delay-ms` | `1000` | Spacing between upstream calls |
//! | `--offline` | `false` | Never call the upstream |
//!
//! Flags override the matching `MARKETPULSE_*` environment variables.

use clap::{Args, Parser, Subcommand};

/// Simulated live NSE quotes with real-data reconciliation.
#[derive(Debug, Parser)]
#[command(name = "marketpulse", author, version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Upstream quote API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Upstream API key (sent as X-API-KEY).
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Request timeout budget in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Symbols per upstream batch call.
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Minimum spacing between upstream batch calls, in milliseconds.
    #[arg(long, global = true)]
    pub batch_delay_ms: Option<u64>,

    /// Serve synthetic data only.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the session phase, headline and next trading open.
    Status,

    /// Fetch the first N quotes of the basket.
    ///
    ///   marketpulse top --count 5
    Top(TopArgs),

    /// Fetch every quote in the basket.
    Quotes,

    /// Fetch one quote.
    ///
    ///   marketpulse quote RELIANCE
    Quote(QuoteArgs),

    /// Fetch OHLCV history, falling back to a synthetic walk.
    ///
    ///   marketpulse history TCS --interval 1d --range 3mo
    History(HistoryArgs),

    /// Filter the basket by symbol or company name.
    ///
    ///   marketpulse search bank
    Search(SearchArgs),

    /// Run the scheduler and print the board periodically.
    ///
    ///   marketpulse watch --seconds 120
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct TopArgs {
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    /// Skip the quote reuse window.
    #[arg(long, default_value_t = false)]
    pub force_live: bool,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Ticker, with or without the `.NS` suffix.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub symbol: String,

    #[arg(long, default_value = "1d")]
    pub interval: String,

    #[arg(long, default_value = "1mo")]
    pub range: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// How long to run before shutting the scheduler down.
    #[arg(long, default_value_t = 60)]
    pub seconds: u64,

    /// Print the board every N seconds.
    #[arg(long, default_value_t = 5)]
    pub every: u64,
}
