use std::io::Write;

use marketpulse_core::{SessionPhase, UtcDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

/// Response metadata printed with every command result.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub command: &'static str,
    pub generated_at: UtcDateTime,
    pub market_status: SessionPhase,
    pub closing_snapshot: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub meta: Meta,
    pub data: Value,
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{payload}")?;
    handle.flush()?;
    Ok(())
}
