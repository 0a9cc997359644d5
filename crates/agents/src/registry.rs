//! Creative agent registry.
//!
//! The single entry point for format discovery and preview/build calls.
//! Holds a per-agent, read-through TTL cache of format catalogs shared by
//! every tenant in the process, and fans out across the default agent plus
//! any tenant-configured agents in priority order.
//!
//! One failing agent never hides formats from the others: aggregate
//! operations log the failure and continue.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesagent_core::agent::{order_agents, AgentDescriptor};
use salesagent_core::format::{FormatSpec, FormatType};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache_store::FormatCacheStore;
use crate::client::{BuildRequest, BuildResult, CreativeAgentClient, PreviewResult};
use crate::error::AgentError;

/// Default time-to-live for a cached agent catalog.
pub const DEFAULT_FORMAT_TTL_SECS: u64 = 3600;

/// Supplies tenant-scoped agent descriptors (typically from the database).
#[async_trait]
pub trait TenantAgentSource: Send + Sync {
    async fn tenant_agents(&self, tenant_id: &str) -> Result<Vec<AgentDescriptor>, AgentError>;
}

// ---------------------------------------------------------------------------
// CachedAgentFormats
// ---------------------------------------------------------------------------

/// One agent's catalog as last fetched. Replaced wholesale on refresh.
#[derive(Debug, Clone)]
pub struct CachedAgentFormats {
    pub formats: Arc<Vec<FormatSpec>>,
    pub fetched_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CachedAgentFormats {
    pub fn new(formats: Vec<FormatSpec>, ttl_seconds: u64) -> Self {
        Self {
            formats: Arc::new(formats),
            fetched_at: Utc::now(),
            ttl_seconds,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX));
        now > self.fetched_at + ttl
    }
}

// ---------------------------------------------------------------------------
// CreativeAgentRegistry
// ---------------------------------------------------------------------------

/// Process-wide registry. Construct once at startup and share via `Arc`.
pub struct CreativeAgentRegistry {
    client: Arc<dyn CreativeAgentClient>,
    agent_source: Option<Arc<dyn TenantAgentSource>>,
    default_agent: AgentDescriptor,
    ttl_seconds: u64,
    format_cache: RwLock<HashMap<String, CachedAgentFormats>>,
    /// Descriptors seen so far, so preview/build by URL can reuse auth.
    known_agents: RwLock<HashMap<String, AgentDescriptor>>,
    offline_store: Option<Arc<FormatCacheStore>>,
}

impl CreativeAgentRegistry {
    pub fn new(client: Arc<dyn CreativeAgentClient>, default_agent: AgentDescriptor) -> Self {
        let mut known = HashMap::new();
        known.insert(default_agent.agent_url.clone(), default_agent.clone());
        Self {
            client,
            agent_source: None,
            default_agent,
            ttl_seconds: DEFAULT_FORMAT_TTL_SECS,
            format_cache: RwLock::new(HashMap::new()),
            known_agents: RwLock::new(known),
            offline_store: None,
        }
    }

    pub fn with_agent_source(mut self, source: Arc<dyn TenantAgentSource>) -> Self {
        self.agent_source = Some(source);
        self
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Attach the disk catalog used for write-through and offline fallback.
    pub fn with_offline_store(mut self, store: Arc<FormatCacheStore>) -> Self {
        self.offline_store = Some(store);
        self
    }

    pub fn default_agent(&self) -> &AgentDescriptor {
        &self.default_agent
    }

    pub fn offline_store(&self) -> Option<&Arc<FormatCacheStore>> {
        self.offline_store.as_ref()
    }

    /// Read the disk catalog into memory if it has not been read yet, so
    /// later lookups never touch the file system.
    pub async fn load_offline_catalog(&self) {
        if let Some(store) = &self.offline_store {
            with_store(store, |store| {
                store.catalog();
            })
            .await;
        }
    }

    /// Agents to query for a tenant: the default plus the tenant's own,
    /// sorted by ascending priority, enabled only.
    ///
    /// A failing agent source degrades to the default agent alone.
    pub async fn agents_for(&self, tenant_id: Option<&str>) -> Vec<AgentDescriptor> {
        let mut agents = vec![self.default_agent.clone()];

        if let (Some(tenant_id), Some(source)) = (tenant_id, &self.agent_source) {
            match source.tenant_agents(tenant_id).await {
                Ok(tenant_agents) => agents.extend(
                    tenant_agents
                        .into_iter()
                        .filter(|a| a.agent_url != self.default_agent.agent_url),
                ),
                Err(e) => {
                    tracing::warn!(tenant_id, error = %e, "Failed to load tenant agents");
                }
            }
        }

        let agents = order_agents(agents);
        let mut known = self.known_agents.write().await;
        for agent in &agents {
            known.insert(agent.agent_url.clone(), agent.clone());
        }
        agents
    }

    /// Read-through fetch of one agent's catalog. Client failures propagate.
    pub async fn formats_for_agent(
        &self,
        agent: &AgentDescriptor,
        force_refresh: bool,
    ) -> Result<Vec<FormatSpec>, AgentError> {
        if !force_refresh {
            let cache = self.format_cache.read().await;
            if let Some(entry) = cache.get(&agent.agent_url) {
                if !entry.is_expired() {
                    return Ok(entry.formats.as_ref().clone());
                }
            }
        }

        let formats = self.client.list_formats(agent).await?;
        tracing::debug!(agent_url = %agent.agent_url, count = formats.len(), "Fetched agent formats");

        self.format_cache.write().await.insert(
            agent.agent_url.clone(),
            CachedAgentFormats::new(formats.clone(), self.ttl_seconds),
        );

        if agent.agent_url == self.default_agent.agent_url {
            if let Some(store) = &self.offline_store {
                let agent_url = agent.agent_url.clone();
                let snapshot = formats.clone();
                with_store(store, move |store| store.save(&agent_url, &snapshot)).await;
            }
        }
        Ok(formats)
    }

    /// Formats from every agent for the tenant, in agent priority order.
    ///
    /// A failing agent is logged and skipped. When the failing agent is the
    /// default one, the disk catalog stands in for it.
    pub async fn list_all_formats(
        &self,
        tenant_id: Option<&str>,
        force_refresh: bool,
    ) -> Vec<FormatSpec> {
        let mut all = Vec::new();
        for agent in self.agents_for(tenant_id).await {
            match self.formats_for_agent(&agent, force_refresh).await {
                Ok(formats) => all.extend(formats),
                Err(e) => {
                    tracing::warn!(
                        agent_url = %agent.agent_url,
                        error = %e,
                        "Creative agent failed, continuing without its formats"
                    );
                    if agent.agent_url == self.default_agent.agent_url {
                        all.extend(self.offline_formats().await);
                    }
                }
            }
        }
        all
    }

    /// Case-insensitive text search on id, name or description, then an
    /// exact type filter.
    pub async fn search_formats(
        &self,
        query: &str,
        tenant_id: Option<&str>,
        type_filter: Option<FormatType>,
    ) -> Vec<FormatSpec> {
        self.list_all_formats(tenant_id, false)
            .await
            .into_iter()
            .filter(|f| f.matches_query(query))
            .filter(|f| type_filter.map_or(true, |t| f.format_type == t))
            .collect()
    }

    /// Exact lookup within one agent's catalog.
    pub async fn get_format(
        &self,
        agent_url: &str,
        format_id: &str,
    ) -> Result<Option<FormatSpec>, AgentError> {
        let agent = self.descriptor_for(agent_url).await;
        let formats = self.formats_for_agent(&agent, false).await?;
        Ok(formats.into_iter().find(|f| f.format_id == format_id))
    }

    pub async fn preview(
        &self,
        agent_url: &str,
        format_id: &str,
        manifest: &Value,
    ) -> Result<PreviewResult, AgentError> {
        let agent = self.descriptor_for(agent_url).await;
        self.client.preview(&agent, format_id, manifest).await
    }

    pub async fn build(
        &self,
        agent_url: &str,
        request: &BuildRequest,
    ) -> Result<BuildResult, AgentError> {
        let agent = self.descriptor_for(agent_url).await;
        self.client.build(&agent, request).await
    }

    /// Force-refresh the default agent's catalog (and so the disk store).
    pub async fn refresh_default(&self) -> Result<usize, AgentError> {
        let agent = self.default_agent.clone();
        self.formats_for_agent(&agent, true).await.map(|f| f.len())
    }

    async fn descriptor_for(&self, agent_url: &str) -> AgentDescriptor {
        self.known_agents
            .read()
            .await
            .get(agent_url)
            .cloned()
            .unwrap_or_else(|| AgentDescriptor::anonymous(agent_url))
    }

    async fn offline_formats(&self) -> Vec<FormatSpec> {
        let Some(store) = &self.offline_store else {
            return Vec::new();
        };
        let formats = with_store(store, FormatCacheStore::catalog)
            .await
            .unwrap_or_default();
        if !formats.is_empty() {
            tracing::warn!(
                path = %store.path().display(),
                count = formats.len(),
                "Using offline format catalog for default agent"
            );
        }
        formats
    }
}

/// Run a disk-touching store call on the blocking pool.
async fn with_store<T, F>(store: &Arc<FormatCacheStore>, f: F) -> Option<T>
where
    F: FnOnce(&FormatCacheStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || f(&store)).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "Format cache task failed");
            None
        }
    }
}
