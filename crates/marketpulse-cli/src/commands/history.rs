use std::str::FromStr;

use marketpulse_core::{HistoryRange, Interval, MarketDataService, Symbol};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &HistoryArgs, service: &MarketDataService) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let interval = Interval::from_str(&args.interval)?;
    let range = HistoryRange::from_str(&args.range)?;

    let series = service.history(&symbol, interval, range).await;
    let result = CommandResult::ok(serde_json::to_value(&series)?);
    Ok(if series.is_real_data {
        result
    } else {
        result.with_warning(format!("history for {symbol} is synthetic"))
    })
}
