//! Creative entity model and write DTOs.

use salesagent_core::creative::CreativeFields;
use salesagent_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `creatives` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Creative {
    pub id: DbId,
    pub tenant_id: String,
    pub principal_id: String,
    pub creative_id: String,
    pub name: String,
    pub agent_url: String,
    /// Format id, namespaced by `agent_url`.
    pub format: String,
    pub status: String,
    /// Buyer fields, preview results and generative build state.
    pub data: serde_json::Value,
    /// Incremented on every update; used for optimistic concurrency.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Creative {
    /// The buyer-controlled fields of this row.
    pub fn fields(&self) -> CreativeFields {
        CreativeFields::from_stored(&self.name, &self.agent_url, &self.format, &self.data)
    }

    /// Context id of the last generative build, if any.
    pub fn generative_context_id(&self) -> Option<&str> {
        self.data
            .get("generative_context_id")
            .and_then(serde_json::Value::as_str)
    }
}

/// Values for inserting a creative.
#[derive(Debug, Clone)]
pub struct NewCreative<'a> {
    pub tenant_id: &'a str,
    pub principal_id: &'a str,
    pub creative_id: &'a str,
    pub name: &'a str,
    pub agent_url: &'a str,
    pub format: &'a str,
    pub status: &'a str,
    pub data: &'a serde_json::Value,
}

/// Values for overwriting a creative's mutable columns.
#[derive(Debug, Clone)]
pub struct CreativeUpdate<'a> {
    pub name: &'a str,
    pub agent_url: &'a str,
    pub format: &'a str,
    pub status: &'a str,
    pub data: &'a serde_json::Value,
}
