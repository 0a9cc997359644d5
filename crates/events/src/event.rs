use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A creative awaits human or AI review.
pub const EVENT_CREATIVE_PENDING_REVIEW: &str = "creative.pending_review";

/// An AI review finished (decision applied or escalated).
pub const EVENT_CREATIVE_REVIEWED: &str = "creative.reviewed";

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A workflow event destined for an external channel.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_source`](PlatformEvent::with_source),
/// [`with_summary`](PlatformEvent::with_summary) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"creative.pending_review"`.
    pub event_type: String,

    pub tenant_id: Option<String>,

    /// Source entity kind (e.g. `"creative"`).
    pub source_entity_type: Option<String>,

    /// External id of the source entity.
    pub source_entity_id: Option<String>,

    /// One-line human-readable text; becomes the Slack message body.
    pub summary: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            tenant_id: None,
            source_entity_type: None,
            source_entity_id: None,
            summary: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Attach a source entity to the event.
    pub fn with_source(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
