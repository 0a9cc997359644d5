//! The tool-call seam between the registry and a creative agent.

use async_trait::async_trait;
use salesagent_core::agent::AgentDescriptor;
use salesagent_core::format::{Dimensions, FormatSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AgentError;

pub const TOOL_LIST_FORMATS: &str = "list_creative_formats";
pub const TOOL_PREVIEW: &str = "preview_creative";
pub const TOOL_BUILD: &str = "build_creative";

/// Remote operations offered by a creative agent.
///
/// Implementations are stateless with respect to callers; caching and
/// fan-out belong to the registry.
#[async_trait]
pub trait CreativeAgentClient: Send + Sync {
    /// Fetch the agent's full format catalog, tagged with its source URL.
    async fn list_formats(&self, agent: &AgentDescriptor) -> Result<Vec<FormatSpec>, AgentError>;

    /// Render a preview. An agent returning no content yields an empty
    /// [`PreviewResult`], not an error.
    async fn preview(
        &self,
        agent: &AgentDescriptor,
        format_id: &str,
        manifest: &Value,
    ) -> Result<PreviewResult, AgentError>;

    /// Run a generative build.
    async fn build(
        &self,
        agent: &AgentDescriptor,
        request: &BuildRequest,
    ) -> Result<BuildResult, AgentError>;
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Raw `preview_creative` response with accessors for the primary render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewResult {
    pub response: Map<String, Value>,
}

impl PreviewResult {
    pub fn from_response(response: Map<String, Value>) -> Self {
        Self { response }
    }

    /// `previews[0].renders[0]`, falling back to a top-level `renders[0]`.
    fn primary_render(&self) -> Option<&Value> {
        let from_previews = self
            .response
            .get("previews")
            .and_then(Value::as_array)
            .and_then(|p| p.first())
            .and_then(|p| p.get("renders"));
        from_previews
            .or_else(|| self.response.get("renders"))
            .and_then(Value::as_array)
            .and_then(|r| r.first())
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.primary_render()
            .and_then(|r| r.get("preview_url"))
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        let dims = self.primary_render()?.get("dimensions")?;
        Some(Dimensions {
            width: u32::try_from(dims.get("width")?.as_u64()?).ok()?,
            height: u32::try_from(dims.get("height")?.as_u64()?).ok()?,
        })
    }

    pub fn duration(&self) -> Option<f64> {
        self.primary_render()?
            .get("dimensions")?
            .get("duration")?
            .as_f64()
    }

    /// True when the agent produced nothing usable as a preview.
    pub fn is_empty(&self) -> bool {
        self.preview_url().is_none()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.response)
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Arguments for `build_creative`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildRequest {
    pub format_id: String,
    pub message: String,
    /// Generation key forwarded to the agent.
    #[serde(rename = "gemini_api_key")]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_offerings: Option<Value>,
    /// Reused across calls that refine the same creative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub finalize: bool,
}

/// `build_creative` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub creative_output: Option<Value>,
}

impl BuildResult {
    /// First asset URL in `creative_output.assets`, whether assets are a
    /// keyed object or a list.
    pub fn output_url(&self) -> Option<&str> {
        fn url_of(asset: &Value) -> Option<&str> {
            asset.get("url").and_then(Value::as_str)
        }

        let assets = self.creative_output.as_ref()?.get("assets")?;
        match assets {
            Value::Object(map) => map.values().find_map(url_of),
            Value::Array(items) => items.iter().find_map(url_of),
            _ => None,
        }
    }

    pub fn output_format(&self) -> Option<&Value> {
        self.creative_output.as_ref()?.get("output_format")
    }
}
