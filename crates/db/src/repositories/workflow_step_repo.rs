//! Repository for the `workflow_steps` table.

use sqlx::PgPool;

use crate::models::workflow_step::{
    WorkflowStep, OBJECT_TYPE_CREATIVE, STEP_STATUS_REQUIRES_APPROVAL,
    STEP_TYPE_CREATIVE_APPROVAL,
};

/// Column list for `workflow_steps` queries.
const COLUMNS: &str = "\
    id, step_id, tenant_id, principal_id, step_type, status, object_type, \
    object_id, request_data, created_at, updated_at";

/// Provides writes of externally tracked workflow steps.
pub struct WorkflowStepRepo;

impl WorkflowStepRepo {
    /// Record that a creative awaits approval.
    pub async fn create_creative_approval(
        pool: &PgPool,
        tenant_id: &str,
        principal_id: &str,
        creative_id: &str,
        request_data: &serde_json::Value,
    ) -> Result<WorkflowStep, sqlx::Error> {
        let step_id = format!("step_{}", uuid::Uuid::new_v4().simple());
        let query = format!(
            "INSERT INTO workflow_steps \
                (step_id, tenant_id, principal_id, step_type, status, object_type, \
                 object_id, request_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowStep>(&query)
            .bind(&step_id)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(STEP_TYPE_CREATIVE_APPROVAL)
            .bind(STEP_STATUS_REQUIRES_APPROVAL)
            .bind(OBJECT_TYPE_CREATIVE)
            .bind(creative_id)
            .bind(request_data)
            .fetch_one(pool)
            .await
    }

    /// List steps attached to one creative.
    pub async fn list_for_creative(
        pool: &PgPool,
        tenant_id: &str,
        creative_id: &str,
    ) -> Result<Vec<WorkflowStep>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_steps \
             WHERE tenant_id = $1 AND object_type = $2 AND object_id = $3 \
             ORDER BY id"
        );
        sqlx::query_as::<_, WorkflowStep>(&query)
            .bind(tenant_id)
            .bind(OBJECT_TYPE_CREATIVE)
            .bind(creative_id)
            .fetch_all(pool)
            .await
    }
}
