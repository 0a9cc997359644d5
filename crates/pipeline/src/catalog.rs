//! Per-call format catalog built from the registry prefetch.

use std::sync::Arc;

use salesagent_agents::FormatCacheStore;
use salesagent_core::format::{FormatRef, FormatSpec};

use crate::error::ItemError;

/// Formats fetched once per sync call, in agent priority order.
pub struct FormatCatalog {
    formats: Vec<FormatSpec>,
    offline: Option<Arc<FormatCacheStore>>,
}

impl FormatCatalog {
    pub fn new(formats: Vec<FormatSpec>, offline: Option<Arc<FormatCacheStore>>) -> Self {
        Self { formats, offline }
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Resolve a creative's format reference.
    ///
    /// Exact id match first (restricted to the named agent when the
    /// reference carries one). Ids that miss are canonicalised through the
    /// offline store's legacy fallback chain and retried. Callers load the
    /// store first so this never reads the file.
    pub fn resolve(&self, reference: &FormatRef) -> Result<&FormatSpec, ItemError> {
        let agent_url = reference.agent_url.as_deref();
        if let Some(found) = self.find_in(agent_url, &reference.id) {
            return Ok(found);
        }

        let canonical = self
            .offline
            .as_ref()
            .and_then(|store| store.lookup(&reference.id))
            .map(|spec| spec.format_id);
        if let Some(canonical) = canonical {
            if let Some(found) = self.find_in(agent_url, &canonical) {
                tracing::debug!(
                    format_id = %reference.id,
                    canonical = %canonical,
                    "Resolved legacy format id"
                );
                return Ok(found);
            }
        }

        Err(ItemError::FormatNotFound(reference.id.clone()))
    }

    /// Exact lookup of a stored `(agent_url, format_id)` pair.
    pub fn find(&self, agent_url: &str, format_id: &str) -> Option<&FormatSpec> {
        self.find_in(Some(agent_url), format_id)
    }

    fn find_in(&self, agent_url: Option<&str>, format_id: &str) -> Option<&FormatSpec> {
        self.formats.iter().find(|f| {
            f.format_id == format_id && agent_url.map_or(true, |url| same_agent(url, &f.agent_url))
        })
    }
}

fn same_agent(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
