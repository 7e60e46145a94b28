use marketpulse_core::{MarketDataService, Symbol};

use crate::cli::{QuoteArgs, SearchArgs, TopArgs};
use crate::error::CliError;

use super::CommandResult;

pub async fn top(args: &TopArgs, service: &MarketDataService) -> Result<CommandResult, CliError> {
    if args.count == 0 {
        return Err(CliError::Command(String::from("--count must be at least 1")));
    }
    let quotes = service.get_top_quotes(args.count, args.force_live).await;
    CommandResult::quotes(&quotes)
}

pub async fn all(service: &MarketDataService) -> Result<CommandResult, CliError> {
    let quotes = service.get_all_quotes().await;
    CommandResult::quotes(&quotes)
}

pub async fn one(args: &QuoteArgs, service: &MarketDataService) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let quote = service.get_quote(&symbol).await;
    CommandResult::quotes(std::slice::from_ref(&quote))
}

pub async fn search(args: &SearchArgs, service: &MarketDataService) -> Result<CommandResult, CliError> {
    if args.query.trim().is_empty() {
        return Err(CliError::Command(String::from("search query must not be empty")));
    }
    let quotes = service.search(&args.query).await;
    let result = CommandResult::quotes(&quotes)?;
    Ok(if quotes.is_empty() {
        result.with_warning(format!("no instruments match '{}'", args.query.trim()))
    } else {
        result
    })
}
