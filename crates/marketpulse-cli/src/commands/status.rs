use marketpulse_core::MarketDataService;

use crate::error::CliError;

use super::CommandResult;

pub async fn run(service: &MarketDataService) -> Result<CommandResult, CliError> {
    let status = service.get_session_status();
    Ok(CommandResult::ok(serde_json::to_value(status)?))
}
