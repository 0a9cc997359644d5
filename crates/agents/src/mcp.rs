//! MCP streamable-HTTP client for creative agents.
//!
//! Each tool call runs a short session against `{agent_url}/mcp`:
//! `initialize`, `notifications/initialized`, then `tools/call`. Responses
//! may arrive as plain JSON or as a server-sent event stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use salesagent_core::agent::AgentDescriptor;
use salesagent_core::format::FormatSpec;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{
    BuildRequest, BuildResult, CreativeAgentClient, PreviewResult, TOOL_BUILD,
    TOOL_LIST_FORMATS, TOOL_PREVIEW,
};
use crate::error::AgentError;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";
const ACCEPT: &str = "application/json, text/event-stream";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// Creative agent client speaking MCP over HTTP.
pub struct McpAgentClient {
    client: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl McpAgentClient {
    /// Build a client whose every tool call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, timeout))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Call a tool and return its payload, or `None` when the tool
    /// returned no content.
    pub async fn call_tool(
        &self,
        agent: &AgentDescriptor,
        tool: &str,
        arguments: Value,
    ) -> Result<Option<Value>, AgentError> {
        tokio::time::timeout(self.timeout, self.run_session(agent, tool, arguments))
            .await
            .map_err(|_| AgentError::Timeout(self.timeout))?
    }

    async fn run_session(
        &self,
        agent: &AgentDescriptor,
        tool: &str,
        arguments: Value,
    ) -> Result<Option<Value>, AgentError> {
        let endpoint = mcp_endpoint(&agent.agent_url);
        let token = match &agent.auth {
            Some(auth) => {
                let token = auth.resolve_token();
                if token.is_none() {
                    tracing::warn!(
                        agent_url = %agent.agent_url,
                        "Agent auth configured but no token resolved, calling without it"
                    );
                }
                token
            }
            None => None,
        };
        let token = token.as_deref();

        let init = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(self.next_id()),
            method: "initialize",
            params: Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "salesagent", "version": env!("CARGO_PKG_VERSION")},
            })),
        };
        let (session_id, _) = self.post(&endpoint, token, None, &init).await?;
        let session_id = session_id.as_deref();

        let initialized = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        self.post(&endpoint, token, session_id, &initialized).await?;

        let call = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(self.next_id()),
            method: "tools/call",
            params: Some(json!({"name": tool, "arguments": arguments})),
        };
        let (_, body) = self.post(&endpoint, token, session_id, &call).await?;
        let result = body
            .ok_or_else(|| AgentError::InvalidResponse(format!("empty response to {tool}")))
            .and_then(unwrap_json_rpc)?;
        extract_tool_payload(tool, result)
    }

    /// POST one JSON-RPC message. Returns the session id header (if any)
    /// and the decoded body (absent for accepted notifications).
    async fn post(
        &self,
        endpoint: &str,
        token: Option<&str>,
        session_id: Option<&str>,
        request: &JsonRpcRequest<'_>,
    ) -> Result<(Option<String>, Option<Value>), AgentError> {
        let mut http = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(request);
        if let Some(token) = token {
            http = http.bearer_auth(token);
        }
        if let Some(id) = session_id {
            http = http.header(SESSION_HEADER, id);
        }

        let response = http
            .send()
            .await
            .map_err(|e| AgentError::from_transport(e, self.timeout))?;

        let status = response.status();
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::from_transport(e, self.timeout))?;

        if !status.is_success() {
            return Err(AgentError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok((session, None));
        }

        let body = if is_sse {
            parse_sse(&text)?
        } else {
            serde_json::from_str(&text).map_err(|e| AgentError::InvalidResponse(e.to_string()))?
        };
        Ok((session, Some(body)))
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl CreativeAgentClient for McpAgentClient {
    async fn list_formats(&self, agent: &AgentDescriptor) -> Result<Vec<FormatSpec>, AgentError> {
        let payload = self
            .call_tool(agent, TOOL_LIST_FORMATS, json!({}))
            .await?
            .ok_or_else(|| AgentError::InvalidResponse("no formats returned".to_string()))?;
        parse_format_list(&payload, &agent.agent_url)
    }

    async fn preview(
        &self,
        agent: &AgentDescriptor,
        format_id: &str,
        manifest: &Value,
    ) -> Result<PreviewResult, AgentError> {
        let arguments = json!({"format_id": format_id, "creative_manifest": manifest});
        match self.call_tool(agent, TOOL_PREVIEW, arguments).await? {
            None => Ok(PreviewResult::default()),
            Some(Value::Object(map)) => Ok(PreviewResult::from_response(map)),
            Some(other) => Err(AgentError::InvalidResponse(format!(
                "preview returned {other}"
            ))),
        }
    }

    async fn build(
        &self,
        agent: &AgentDescriptor,
        request: &BuildRequest,
    ) -> Result<BuildResult, AgentError> {
        let arguments =
            serde_json::to_value(request).map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        let payload = self
            .call_tool(agent, TOOL_BUILD, arguments)
            .await?
            .ok_or_else(|| AgentError::InvalidResponse("build returned no content".to_string()))?;
        serde_json::from_value(payload).map_err(|e| AgentError::InvalidResponse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// `https://agent.example` -> `https://agent.example/mcp`. URLs already
/// ending in `/mcp` are kept.
pub fn mcp_endpoint(agent_url: &str) -> String {
    let base = agent_url.trim_end_matches('/');
    if base.ends_with("/mcp") {
        base.to_string()
    } else {
        format!("{base}/mcp")
    }
}

/// Decode an SSE body. The last `data:` event carries the response.
fn parse_sse(body: &str) -> Result<Value, AgentError> {
    let mut events: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        } else if line.trim().is_empty() && !current.is_empty() {
            events.push(current.join("\n"));
            current.clear();
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    let last = events
        .pop()
        .ok_or_else(|| AgentError::InvalidResponse("event stream carried no data".to_string()))?;
    serde_json::from_str(&last).map_err(|e| AgentError::InvalidResponse(e.to_string()))
}

fn unwrap_json_rpc(body: Value) -> Result<Value, AgentError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(AgentError::JsonRpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| AgentError::InvalidResponse("missing result".to_string()))
}

/// Pull the payload out of a `tools/call` result.
///
/// Prefers `structuredContent`; otherwise the first `content` element,
/// parsing text as JSON. No content at all is `Ok(None)`.
fn extract_tool_payload(tool: &str, result: Value) -> Result<Option<Value>, AgentError> {
    let first_text = || {
        result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
    };

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(AgentError::Tool {
            tool: tool.to_string(),
            message: first_text().unwrap_or("tool reported an error").to_string(),
        });
    }

    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        return Ok(Some(structured.clone()));
    }

    let Some(first) = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return Ok(None);
    };

    match first.get("text").and_then(Value::as_str) {
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| AgentError::InvalidResponse(format!("{tool} returned non-JSON text: {e}"))),
        None => Ok(Some(first.get("json").unwrap_or(first).clone())),
    }
}

/// Parse a `{"formats": [...]}` payload. Any malformed entry fails the list.
fn parse_format_list(payload: &Value, agent_url: &str) -> Result<Vec<FormatSpec>, AgentError> {
    let items = payload
        .get("formats")
        .and_then(Value::as_array)
        .ok_or_else(|| AgentError::InvalidResponse("response has no formats array".to_string()))?;
    items
        .iter()
        .map(|item| {
            FormatSpec::from_wire(item, agent_url)
                .map_err(|e| AgentError::InvalidResponse(e.to_string()))
        })
        .collect()
}
