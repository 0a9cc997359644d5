//! Tenant creative agents loaded from the `creative_agents` table.

use async_trait::async_trait;
use salesagent_agents::{AgentError, TenantAgentSource};
use salesagent_core::agent::AgentDescriptor;
use salesagent_db::repositories::CreativeAgentRepo;
use salesagent_db::DbPool;

pub struct DbAgentSource {
    pool: DbPool,
}

impl DbAgentSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantAgentSource for DbAgentSource {
    async fn tenant_agents(&self, tenant_id: &str) -> Result<Vec<AgentDescriptor>, AgentError> {
        let agents = CreativeAgentRepo::list_for_tenant(&self.pool, tenant_id)
            .await
            .map_err(|e| AgentError::Source(e.to_string()))?;
        Ok(agents.iter().map(|a| a.to_descriptor()).collect())
    }
}
