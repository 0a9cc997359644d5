//! Workflow steps created for creatives that need review.

use salesagent_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

pub const STEP_TYPE_CREATIVE_APPROVAL: &str = "creative_approval";
pub const STEP_STATUS_REQUIRES_APPROVAL: &str = "requires_approval";
pub const OBJECT_TYPE_CREATIVE: &str = "creative";

/// A row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowStep {
    pub id: DbId,
    pub step_id: String,
    pub tenant_id: String,
    pub principal_id: String,
    pub step_type: String,
    pub status: String,
    pub object_type: String,
    pub object_id: String,
    pub request_data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
