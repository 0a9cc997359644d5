//! Repository for the `creative_agents` table.

use sqlx::PgPool;

use crate::models::creative_agent::{CreateCreativeAgent, CreativeAgent};

/// Column list for `creative_agents` queries.
const COLUMNS: &str = "\
    id, tenant_id, agent_url, name, enabled, priority, \
    auth_type, auth_credentials, created_at, updated_at";

/// Default priority for tenant agents (after the system default at 1).
const DEFAULT_PRIORITY: i32 = 10;

/// Provides CRUD for tenant-scoped creative agents.
pub struct CreativeAgentRepo;

impl CreativeAgentRepo {
    /// Register a tenant agent.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCreativeAgent,
    ) -> Result<CreativeAgent, sqlx::Error> {
        let query = format!(
            "INSERT INTO creative_agents \
                (tenant_id, agent_url, name, enabled, priority, auth_type, auth_credentials) \
             VALUES ($1, $2, $3, COALESCE($4, true), COALESCE($5, $6), $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreativeAgent>(&query)
            .bind(&input.tenant_id)
            .bind(&input.agent_url)
            .bind(&input.name)
            .bind(input.enabled)
            .bind(input.priority)
            .bind(DEFAULT_PRIORITY)
            .bind(input.auth_type.as_deref())
            .bind(input.auth_credentials.as_deref())
            .fetch_one(pool)
            .await
    }

    /// List all agents configured for a tenant, including disabled ones,
    /// ordered by priority.
    pub async fn list_for_tenant(
        pool: &PgPool,
        tenant_id: &str,
    ) -> Result<Vec<CreativeAgent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM creative_agents \
             WHERE tenant_id = $1 \
             ORDER BY priority, id"
        );
        sqlx::query_as::<_, CreativeAgent>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }
}
