use std::time::Duration;

/// Errors from calling a creative agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The HTTP request failed for a reason other than connect or timeout.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The agent could not be reached at all.
    #[error("Agent unreachable: {0}")]
    Connection(String),

    /// The call did not complete within the configured timeout.
    #[error("Agent call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The agent answered with a non-2xx status.
    #[error("Agent returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The JSON-RPC envelope carried an error object.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    /// The tool ran and reported failure (`isError`).
    #[error("Tool {tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// The response could not be interpreted.
    #[error("Invalid agent response: {0}")]
    InvalidResponse(String),

    /// Tenant agent configuration could not be loaded.
    #[error("Agent configuration unavailable: {0}")]
    Source(String),
}

/// JSON-RPC internal error.
const JSONRPC_INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC codes reserved for implementation-defined server errors.
const JSONRPC_SERVER_ERRORS: std::ops::RangeInclusive<i64> = -32099..=-32000;

impl AgentError {
    /// Whether the failure means the agent was unavailable, as opposed to the
    /// agent answering and rejecting the request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Connection(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::JsonRpc { code, .. } => {
                *code == JSONRPC_INTERNAL_ERROR || JSONRPC_SERVER_ERRORS.contains(code)
            }
            Self::InvalidResponse(_) | Self::Source(_) => true,
            Self::Tool { .. } => false,
        }
    }

    /// Classify a reqwest failure.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_unavailable() {
        assert!(AgentError::Connection("refused".into()).is_unavailable());
        assert!(AgentError::Timeout(Duration::from_secs(30)).is_unavailable());
        assert!(AgentError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_unavailable());
    }

    #[test]
    fn server_side_failures_are_unavailable() {
        for code in [-32603, -32000, -32099] {
            assert!(
                AgentError::JsonRpc {
                    code,
                    message: "boom".into()
                }
                .is_unavailable(),
                "code {code}"
            );
        }
        assert!(AgentError::InvalidResponse("not json".into()).is_unavailable());
    }

    #[test]
    fn agent_rejections_are_not_unavailable() {
        assert!(!AgentError::JsonRpc {
            code: -32602,
            message: "invalid params".into()
        }
        .is_unavailable());
        assert!(!AgentError::HttpStatus {
            status: 400,
            body: "bad".into()
        }
        .is_unavailable());
        assert!(!AgentError::Tool {
            tool: "preview_creative".into(),
            message: "unknown format".into()
        }
        .is_unavailable());
    }

    #[test]
    fn timeout_display_uses_seconds() {
        let err = AgentError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Agent call timed out after 30s");
    }
}
