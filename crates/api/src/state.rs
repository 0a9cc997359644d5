use std::sync::Arc;

use salesagent_agents::CreativeAgentRegistry;
use salesagent_pipeline::CreativeSyncPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: salesagent_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Process-wide format registry, shared with the pipeline.
    pub registry: Arc<CreativeAgentRegistry>,
    pub pipeline: Arc<CreativeSyncPipeline>,
}
