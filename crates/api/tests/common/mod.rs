use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use salesagent_agents::{
    AgentError, BuildRequest, BuildResult, CreativeAgentClient, CreativeAgentRegistry,
    PreviewResult,
};
use salesagent_api::config::ServerConfig;
use salesagent_api::router::build_app_router;
use salesagent_api::state::AppState;
use salesagent_core::agent::AgentDescriptor;
use salesagent_core::format::FormatSpec;
use salesagent_db::models::tenant::CreateTenant;
use salesagent_db::repositories::TenantRepo;
use salesagent_pipeline::{CreativeSyncPipeline, SyncConfig};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

pub const AGENT: &str = "https://agent.test";

/// Creative agent with a fixed two-format catalog and a working preview.
pub struct StubAgent;

#[async_trait]
impl CreativeAgentClient for StubAgent {
    async fn list_formats(&self, agent: &AgentDescriptor) -> Result<Vec<FormatSpec>, AgentError> {
        let wire = [
            json!({
                "format_id": "display_300x250_image",
                "name": "Medium Rectangle",
                "type": "display",
                "renders": [{"role": "primary", "dimensions": {"width": 300, "height": 250}}],
            }),
            json!({
                "format_id": "video_1280x720",
                "name": "HD Video",
                "type": "video",
                "renders": [{"role": "primary", "dimensions": {"width": 1280, "height": 720}}],
            }),
        ];
        Ok(wire
            .iter()
            .map(|w| FormatSpec::from_wire(w, &agent.agent_url).unwrap())
            .collect())
    }

    async fn preview(
        &self,
        _agent: &AgentDescriptor,
        _format_id: &str,
        _manifest: &Value,
    ) -> Result<PreviewResult, AgentError> {
        let response = json!({"previews": [{"renders": [{"preview_url": "https://agent.test/p/1"}]}]});
        Ok(PreviewResult::from_response(
            response.as_object().unwrap().clone(),
        ))
    }

    async fn build(
        &self,
        _agent: &AgentDescriptor,
        _request: &BuildRequest,
    ) -> Result<BuildResult, AgentError> {
        Err(AgentError::Tool {
            tool: "build_creative".into(),
            message: "no generative formats here".into(),
        })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        default_agent_url: AGENT.to_string(),
        agent_timeout_secs: 5,
        format_cache_ttl_secs: 3600,
        format_cache_path: PathBuf::from("unused.json"),
        format_cache_refresh_secs: 86_400,
        gemini_api_key: None,
        gemini_model: "test".to_string(),
        review_workers: 1,
    }
}

/// Full router over the given pool with the stub agent behind the registry.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let registry = Arc::new(CreativeAgentRegistry::new(
        Arc::new(StubAgent),
        AgentDescriptor::system_default(AGENT),
    ));
    let pipeline = CreativeSyncPipeline::new(pool.clone(), Arc::clone(&registry), SyncConfig::default());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry,
        pipeline: Arc::new(pipeline),
    };
    build_app_router(state, &config)
}

pub async fn seed_tenant(pool: &PgPool, tenant_id: &str) {
    TenantRepo::create(
        pool,
        &CreateTenant {
            tenant_id: tenant_id.to_string(),
            name: format!("Tenant {tenant_id}"),
            approval_mode: Some("auto-approve".to_string()),
            creative_review_criteria: None,
            slack_webhook_url: None,
        },
    )
    .await
    .unwrap();
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
