//! Tenant configuration consumed by the creative sync core.

use salesagent_core::approval::ApprovalMode;
use salesagent_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tenants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: DbId,
    pub tenant_id: String,
    pub name: String,
    pub approval_mode: String,
    /// Free-text policy handed to the AI reviewer.
    pub creative_review_criteria: Option<String>,
    /// Webhook receiving creative review notifications.
    pub slack_webhook_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Tenant {
    pub fn approval_mode(&self) -> ApprovalMode {
        ApprovalMode::parse(Some(&self.approval_mode))
    }
}

/// DTO for creating a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenant {
    pub tenant_id: String,
    pub name: String,
    pub approval_mode: Option<String>,
    pub creative_review_criteria: Option<String>,
    pub slack_webhook_url: Option<String>,
}
