//! Tenant creative approval policy.
//!
//! Decides the initial status of a created or updated creative and whether
//! an AI review task or a human approval step follows.

use serde::{Deserialize, Serialize};

use crate::creative::{STATUS_APPROVED, STATUS_PENDING};

/// Confidence at or above which an AI review decision is applied without a human.
pub const AI_DECISION_CONFIDENCE_THRESHOLD: f64 = 0.9;

/// Tenant-level approval mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    AutoApprove,
    AiPowered,
    #[default]
    RequireHuman,
}

impl ApprovalMode {
    /// Parse a stored approval mode. Unknown or missing values fall back to
    /// [`ApprovalMode::RequireHuman`].
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase().replace('_', "-")) {
            Some(v) if v == "auto-approve" => Self::AutoApprove,
            Some(v) if v == "ai-powered" => Self::AiPowered,
            _ => Self::RequireHuman,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApprove => "auto-approve",
            Self::AiPowered => "ai-powered",
            Self::RequireHuman => "require-human",
        }
    }

    /// Status a creative receives when it is written under this mode.
    pub fn initial_status(&self) -> &'static str {
        match self {
            Self::AutoApprove => STATUS_APPROVED,
            Self::AiPowered | Self::RequireHuman => STATUS_PENDING,
        }
    }

    /// Whether an asynchronous AI review must be dispatched after commit.
    pub fn dispatches_ai_review(&self) -> bool {
        matches!(self, Self::AiPowered)
    }

    /// Whether a human must act before the creative can run.
    pub fn requires_human(&self) -> bool {
        matches!(self, Self::RequireHuman)
    }
}

/// Decision returned by an AI reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
    RequireHuman,
}

/// Map an AI decision and its confidence to the creative's next status.
///
/// Returns `None` when the creative should stay pending for a human.
pub fn status_for_review(decision: ReviewDecision, confidence: f64) -> Option<&'static str> {
    if confidence < AI_DECISION_CONFIDENCE_THRESHOLD {
        return None;
    }
    match decision {
        ReviewDecision::Approve => Some(STATUS_APPROVED),
        ReviewDecision::Reject => Some(crate::creative::STATUS_REJECTED),
        ReviewDecision::RequireHuman => None,
    }
}
