use std::sync::Arc;
use std::time::{Duration, Instant};

use marketpulse_core::{MarketDataService, Scheduler, ServiceConfig, SimulationEngine};
use tracing::info;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output::{self, Envelope, Meta};

pub async fn run(
    args: &WatchArgs,
    service: Arc<MarketDataService>,
    config: &ServiceConfig,
    pretty: bool,
) -> Result<(), CliError> {
    if args.every == 0 {
        return Err(CliError::Command(String::from("--every must be at least 1")));
    }

    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.seconds);
    let handle = Scheduler::spawn(Arc::clone(&service), config.schedule, SimulationEngine::default());
    info!(seconds = args.seconds, "watching market board");

    let mut every = tokio::time::interval(Duration::from_secs(args.every));
    let outcome = loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break Ok(()),
            _ = tokio::signal::ctrl_c() => break Ok(()),
            _ = every.tick() => {
                let board = handle.board().await;
                let envelope = Envelope {
                    meta: Meta {
                        command: "watch",
                        generated_at: service.now(),
                        market_status: board.phase,
                        closing_snapshot: service.has_closing_snapshot().await,
                        latency_ms: started.elapsed().as_millis() as u64,
                        warnings: Vec::new(),
                    },
                    data: match serde_json::to_value(&board) {
                        Ok(data) => data,
                        Err(error) => break Err(error.into()),
                    },
                };
                if let Err(error) = output::render(&envelope, pretty) {
                    break Err(error);
                }
            }
        }
    };

    handle.shutdown().await;
    outcome
}
