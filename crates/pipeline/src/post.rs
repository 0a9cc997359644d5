//! Post-processing for creatives left pending after a sync.
//!
//! Side effects only: a workflow step for external tracking, then either an
//! AI review task or a human-review notification depending on the tenant's
//! approval mode. Failures are logged and never change sync results.

use salesagent_core::approval::ApprovalMode;
use salesagent_db::models::tenant::Tenant;
use salesagent_db::repositories::WorkflowStepRepo;
use salesagent_db::DbPool;
use serde_json::{json, Value};

use crate::notify::{CreativeRef, Notifier};
use crate::review::ReviewQueue;
use crate::reviewer::ReviewRequest;

/// A creative committed with status `pending` during this sync.
#[derive(Debug, Clone)]
pub struct PendingCreative {
    pub creative: CreativeRef,
    pub data: Value,
}

pub async fn process_pending(
    pool: &DbPool,
    tenant: &Tenant,
    approval_mode: ApprovalMode,
    review_queue: Option<&ReviewQueue>,
    notifier: &Notifier,
    pending: Vec<PendingCreative>,
) {
    let webhook_url = tenant.slack_webhook_url.as_deref();

    for item in pending {
        let creative = &item.creative;
        let request_data = json!({
            "name": creative.name,
            "format": {"agent_url": creative.agent_url, "id": creative.format_id},
            "approval_mode": approval_mode.as_str(),
        });
        if let Err(e) = WorkflowStepRepo::create_creative_approval(
            pool,
            &creative.tenant_id,
            &creative.principal_id,
            &creative.creative_id,
            &request_data,
        )
        .await
        {
            tracing::warn!(
                creative_id = %creative.creative_id,
                error = %e,
                "Failed to record approval workflow step"
            );
        }

        match (approval_mode, review_queue) {
            (ApprovalMode::AiPowered, Some(queue)) => {
                let request = ReviewRequest {
                    creative: creative.clone(),
                    creative_data: item.data.clone(),
                    review_criteria: tenant.creative_review_criteria.clone(),
                    webhook_url: tenant.slack_webhook_url.clone(),
                };
                if let Err(e) = queue.submit(request).await {
                    tracing::warn!(
                        creative_id = %creative.creative_id,
                        error = %e,
                        "Could not queue AI review, falling back to human review"
                    );
                    notifier.creative_pending(webhook_url, creative);
                }
            }
            (ApprovalMode::AiPowered, None) => {
                tracing::warn!(
                    creative_id = %creative.creative_id,
                    "AI review not configured, falling back to human review"
                );
                notifier.creative_pending(webhook_url, creative);
            }
            (ApprovalMode::RequireHuman, _) => notifier.creative_pending(webhook_url, creative),
            (ApprovalMode::AutoApprove, _) => {}
        }
    }
}
