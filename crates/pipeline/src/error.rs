use salesagent_agents::AgentError;
use salesagent_core::error::CoreError;

/// Why a single creative failed. Captured into its `SyncResult`, never
/// raised past the item boundary.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    /// Malformed input, or the agent answered and refused the creative.
    #[error("{0}")]
    Validation(String),

    #[error("Format '{0}' is not offered by any configured creative agent")]
    FormatNotFound(String),

    /// Network or agent failure during preview/build. The creative is not
    /// stored.
    #[error("Creative agent unavailable, creative was not stored; retry recommended ({0})")]
    AgentUnavailable(String),

    /// Static creative with no preview and no media URL to fall back on.
    #[error("Creative agent returned no preview and no media url was supplied")]
    PreviewUnavailable,

    #[error("Generative format '{0}' requires a generation API key, which is not configured")]
    GenerativeConfig(String),

    /// The stored row changed between validation and write.
    #[error("Creative was modified concurrently; retry recommended")]
    ConcurrentModification,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CoreError> for ItemError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl ItemError {
    /// Classify a preview/build failure: transport problems fail closed with
    /// a retry hint, agent refusals are validation failures.
    pub fn from_agent(err: AgentError) -> Self {
        if err.is_unavailable() {
            Self::AgentUnavailable(err.to_string())
        } else {
            Self::Validation(format!("Creative agent rejected the creative: {err}"))
        }
    }
}

/// Batch-level failure. Aborts the whole call.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No tenant context")]
    MissingTenant,

    #[error("No principal context")]
    MissingPrincipal,

    #[error("Unknown tenant '{0}'")]
    UnknownTenant(String),

    /// Strict mode: a package reference could not be resolved.
    #[error("Package '{package_id}' for creative '{creative_id}' could not be resolved")]
    AssignmentResolution {
        creative_id: String,
        package_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unavailable_agent_fails_closed_with_retry_hint() {
        let err = ItemError::from_agent(AgentError::Connection("refused".into()));
        assert_matches!(err, ItemError::AgentUnavailable(_));
        assert!(err.to_string().contains("retry"));
    }

    #[test]
    fn agent_internal_error_fails_closed_with_retry_hint() {
        let err = ItemError::from_agent(AgentError::JsonRpc {
            code: -32603,
            message: "internal error".into(),
        });
        assert_matches!(err, ItemError::AgentUnavailable(_));
        assert!(err.to_string().contains("retry recommended"));

        let err = ItemError::from_agent(AgentError::InvalidResponse("truncated body".into()));
        assert_matches!(err, ItemError::AgentUnavailable(_));
    }

    #[test]
    fn agent_refusal_is_validation() {
        let err = ItemError::from_agent(AgentError::Tool {
            tool: "preview_creative".into(),
            message: "missing asset".into(),
        });
        assert_matches!(err, ItemError::Validation(msg) if msg.contains("missing asset"));
    }

    #[test]
    fn core_validation_keeps_message() {
        let err: ItemError = CoreError::Validation("name is required".into()).into();
        assert_eq!(err.to_string(), "name is required");
    }
}
