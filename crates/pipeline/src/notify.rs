//! Webhook notifications for creatives that need attention.

use salesagent_core::approval::ReviewDecision;
use salesagent_events::event::{EVENT_CREATIVE_PENDING_REVIEW, EVENT_CREATIVE_REVIEWED};
use salesagent_events::{PlatformEvent, WebhookDelivery};
use serde_json::json;

/// Identifies a creative in notifications and review tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct CreativeRef {
    pub id: salesagent_core::types::DbId,
    pub tenant_id: String,
    pub principal_id: String,
    pub creative_id: String,
    pub name: String,
    pub agent_url: String,
    pub format_id: String,
}

/// Sends events to a tenant webhook on a background task. Without a
/// delivery service (or without a tenant URL) every call is a no-op.
#[derive(Clone, Default)]
pub struct Notifier {
    delivery: Option<WebhookDelivery>,
}

impl Notifier {
    pub fn new(delivery: WebhookDelivery) -> Self {
        Self {
            delivery: Some(delivery),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn creative_pending(&self, webhook_url: Option<&str>, creative: &CreativeRef) {
        self.send(webhook_url, pending_event(creative));
    }

    pub fn creative_reviewed(
        &self,
        webhook_url: Option<&str>,
        creative: &CreativeRef,
        decision: ReviewDecision,
        confidence: f64,
        status: &str,
        reason: &str,
    ) {
        self.send(
            webhook_url,
            reviewed_event(creative, decision, confidence, status, reason),
        );
    }

    fn send(&self, webhook_url: Option<&str>, event: PlatformEvent) {
        let (Some(delivery), Some(url)) = (&self.delivery, webhook_url) else {
            return;
        };
        delivery.spawn_deliver(url.to_string(), event);
    }
}

fn pending_event(creative: &CreativeRef) -> PlatformEvent {
    PlatformEvent::new(EVENT_CREATIVE_PENDING_REVIEW)
        .for_tenant(&creative.tenant_id)
        .with_source("creative", &creative.creative_id)
        .with_summary(format!(
            "Creative \"{}\" ({}) from {} is awaiting approval",
            creative.name, creative.format_id, creative.principal_id
        ))
        .with_payload(json!({
            "creative_id": creative.creative_id,
            "principal_id": creative.principal_id,
            "name": creative.name,
            "format": {"agent_url": creative.agent_url, "id": creative.format_id},
        }))
}

fn reviewed_event(
    creative: &CreativeRef,
    decision: ReviewDecision,
    confidence: f64,
    status: &str,
    reason: &str,
) -> PlatformEvent {
    PlatformEvent::new(EVENT_CREATIVE_REVIEWED)
        .for_tenant(&creative.tenant_id)
        .with_source("creative", &creative.creative_id)
        .with_summary(format!(
            "AI review of \"{}\": {:?} ({:.0}% confidence), status {status}",
            creative.name,
            decision,
            confidence * 100.0
        ))
        .with_payload(json!({
            "creative_id": creative.creative_id,
            "decision": decision,
            "confidence": confidence,
            "status": status,
            "reason": reason,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creative() -> CreativeRef {
        CreativeRef {
            id: 1,
            tenant_id: "t1".into(),
            principal_id: "p1".into(),
            creative_id: "c1".into(),
            name: "Banner".into(),
            agent_url: "https://creative.adcontextprotocol.org".into(),
            format_id: "display_300x250_image".into(),
        }
    }

    #[test]
    fn pending_event_names_creative() {
        let event = pending_event(&creative());
        assert_eq!(event.event_type, "creative.pending_review");
        assert_eq!(event.tenant_id.as_deref(), Some("t1"));
        assert!(event.summary.unwrap().contains("Banner"));
        assert_eq!(event.payload["format"]["id"], "display_300x250_image");
    }

    #[test]
    fn reviewed_event_carries_decision() {
        let event = reviewed_event(&creative(), ReviewDecision::Approve, 0.95, "approved", "ok");
        assert_eq!(event.payload["decision"], "approve");
        assert_eq!(event.payload["status"], "approved");
        assert!(event.summary.unwrap().contains("95%"));
    }

    #[test]
    fn disabled_notifier_is_a_no_op() {
        // Must not need a runtime: nothing is spawned.
        Notifier::disabled().creative_pending(Some("https://hooks.example"), &creative());
    }
}
