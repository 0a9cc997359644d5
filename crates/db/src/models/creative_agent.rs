//! Tenant-scoped creative agent configuration.

use salesagent_core::agent::{AgentAuth, AgentDescriptor};
use salesagent_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const AUTH_TYPE_BEARER: &str = "bearer";
pub const AUTH_TYPE_BEARER_ENV: &str = "bearer_env";

/// A row from the `creative_agents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreativeAgent {
    pub id: DbId,
    pub tenant_id: String,
    pub agent_url: String,
    pub name: String,
    pub enabled: bool,
    pub priority: i32,
    pub auth_type: Option<String>,
    /// Inline token or environment variable name, depending on `auth_type`.
    #[serde(skip_serializing)]
    pub auth_credentials: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CreativeAgent {
    /// Convert the row into a registry descriptor.
    ///
    /// An auth type without credentials yields no auth, so the call goes out
    /// unauthenticated and the remote decides.
    pub fn to_descriptor(&self) -> AgentDescriptor {
        let auth = match (self.auth_type.as_deref(), self.auth_credentials.as_ref()) {
            (Some(AUTH_TYPE_BEARER), Some(token)) => Some(AgentAuth::Bearer {
                token: token.clone(),
            }),
            (Some(AUTH_TYPE_BEARER_ENV), Some(var)) => Some(AgentAuth::BearerEnv {
                env_var: var.clone(),
            }),
            _ => None,
        };
        AgentDescriptor {
            agent_url: self.agent_url.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            priority: self.priority,
            auth,
        }
    }
}

/// DTO for registering a tenant agent.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCreativeAgent {
    pub tenant_id: String,
    pub agent_url: String,
    pub name: String,
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub auth_type: Option<String>,
    pub auth_credentials: Option<String>,
}
