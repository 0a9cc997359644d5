//! Periodic refresh of the default agent's format catalog.
//!
//! A forced fetch goes through the registry, which writes the catalog
//! through to the disk store used when the agent is unreachable.

use std::sync::Arc;
use std::time::Duration;

use salesagent_agents::CreativeAgentRegistry;
use tokio_util::sync::CancellationToken;

/// Run the refresh loop until `cancel` fires. The first tick is immediate,
/// so the disk store is warmed at startup.
pub async fn run(registry: Arc<CreativeAgentRegistry>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Format cache refresh job started");

    let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Format cache refresh job stopping");
                break;
            }
            _ = interval.tick() => {
                match registry.refresh_default().await {
                    Ok(count) => {
                        tracing::info!(count, "Format cache refresh: default catalog updated");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Format cache refresh failed, keeping previous catalog");
                    }
                }
            }
        }
    }
}
