//! Creative agent access: the disk format cache, the MCP tool-call client,
//! and the registry that fans out across agents with a per-agent TTL cache.

pub mod cache_store;
pub mod client;
pub mod error;
pub mod mcp;
pub mod registry;

pub use cache_store::FormatCacheStore;
pub use client::{BuildRequest, BuildResult, CreativeAgentClient, PreviewResult};
pub use error::AgentError;
pub use mcp::McpAgentClient;
pub use registry::{CachedAgentFormats, CreativeAgentRegistry, TenantAgentSource};
