//! Per-invocation sync result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What happened to one input creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Unchanged,
    Failed,
}

/// How unresolvable assignment references are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// An unresolvable package aborts the whole assignment phase.
    #[default]
    Strict,
    /// Unresolvable packages are skipped and reported per creative.
    Lenient,
}

/// Outcome for one input creative. Produced fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResult {
    pub creative_id: String,
    pub action: SyncAction,
    /// Stored status after the sync, `None` for failed items.
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assigned_to: Vec<String>,
    /// Package id -> reason the assignment could not be made.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub assignment_errors: BTreeMap<String, String>,
}

impl SyncResult {
    pub fn failed(creative_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            creative_id: creative_id.into(),
            action: SyncAction::Failed,
            status: None,
            errors: vec![error.into()],
            changes: Vec::new(),
            assigned_to: Vec::new(),
            assignment_errors: BTreeMap::new(),
        }
    }

    pub fn succeeded(
        creative_id: impl Into<String>,
        action: SyncAction,
        status: impl Into<String>,
        changes: Vec<String>,
    ) -> Self {
        Self {
            creative_id: creative_id.into(),
            action,
            status: Some(status.into()),
            errors: Vec::new(),
            changes,
            assigned_to: Vec::new(),
            assignment_errors: BTreeMap::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.action == SyncAction::Failed
    }
}

/// Aggregate counts over a batch of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn from_results(results: &[SyncResult]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Default::default()
            },
            |mut acc, r| {
                match r.action {
                    SyncAction::Created => acc.created += 1,
                    SyncAction::Updated => acc.updated += 1,
                    SyncAction::Unchanged => acc.unchanged += 1,
                    SyncAction::Failed => acc.failed += 1,
                }
                acc
            },
        )
    }
}
