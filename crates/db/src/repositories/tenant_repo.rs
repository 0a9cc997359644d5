//! Repository for the `tenants` table.

use sqlx::PgPool;

use crate::models::tenant::{CreateTenant, Tenant};

/// Column list for `tenants` queries.
const COLUMNS: &str = "\
    id, tenant_id, name, approval_mode, creative_review_criteria, \
    slack_webhook_url, created_at, updated_at";

/// Provides reads of tenant configuration.
pub struct TenantRepo;

impl TenantRepo {
    /// Insert a tenant. Approval mode defaults to `require-human`.
    pub async fn create(pool: &PgPool, input: &CreateTenant) -> Result<Tenant, sqlx::Error> {
        let query = format!(
            "INSERT INTO tenants \
                (tenant_id, name, approval_mode, creative_review_criteria, slack_webhook_url) \
             VALUES ($1, $2, COALESCE($3, 'require-human'), $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tenant>(&query)
            .bind(&input.tenant_id)
            .bind(&input.name)
            .bind(input.approval_mode.as_deref())
            .bind(input.creative_review_criteria.as_deref())
            .bind(input.slack_webhook_url.as_deref())
            .fetch_one(pool)
            .await
    }

    /// Find a tenant by its external id.
    pub async fn find_by_tenant_id(
        pool: &PgPool,
        tenant_id: &str,
    ) -> Result<Option<Tenant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tenants WHERE tenant_id = $1");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }
}
