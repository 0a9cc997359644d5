//! Creative agent descriptors.
//!
//! The registry always knows one system default agent and may load any
//! number of tenant-scoped agents. Agents are queried in ascending
//! `priority` order and only when `enabled`.

use serde::{Deserialize, Serialize};

/// URL of the system default creative agent.
pub const DEFAULT_AGENT_URL: &str = "https://creative.adcontextprotocol.org";

/// Display name of the system default creative agent.
pub const DEFAULT_AGENT_NAME: &str = "AdCP Standard Creative Agent";

/// Priority assigned to the default agent. Tenant agents with a lower
/// value are queried before it.
pub const DEFAULT_AGENT_PRIORITY: i32 = 1;

/// How to authenticate to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAuth {
    /// Bearer token stored inline.
    Bearer { token: String },
    /// Bearer token read from the named environment variable at call time.
    BearerEnv { env_var: String },
}

impl AgentAuth {
    /// Resolve the bearer token, returning `None` when it cannot be found.
    ///
    /// `lookup_env` is injected so callers (and tests) control the source of
    /// environment values.
    pub fn resolve_token_with<F>(&self, lookup_env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = match self {
            Self::Bearer { token } => Some(token.clone()),
            Self::BearerEnv { env_var } => lookup_env(env_var),
        };
        token.filter(|t| !t.trim().is_empty())
    }

    /// Resolve the bearer token against the process environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }
}

/// A creative agent endpoint known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_url: String,
    pub name: String,
    pub enabled: bool,
    /// Lower values are queried first.
    pub priority: i32,
    pub auth: Option<AgentAuth>,
}

impl AgentDescriptor {
    /// The system default agent at `agent_url`.
    pub fn system_default(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            name: DEFAULT_AGENT_NAME.to_string(),
            enabled: true,
            priority: DEFAULT_AGENT_PRIORITY,
            auth: None,
        }
    }

    /// An unauthenticated descriptor for an agent that is only known by URL.
    pub fn anonymous(agent_url: impl Into<String>) -> Self {
        let agent_url = agent_url.into();
        Self {
            name: agent_url.clone(),
            agent_url,
            enabled: true,
            priority: i32::MAX,
            auth: None,
        }
    }
}

/// Order agents by ascending priority (stable, so ties keep insertion order)
/// and drop disabled ones.
pub fn order_agents(mut agents: Vec<AgentDescriptor>) -> Vec<AgentDescriptor> {
    agents.sort_by_key(|a| a.priority);
    agents.retain(|a| a.enabled);
    agents
}
