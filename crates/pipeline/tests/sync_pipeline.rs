//! Integration tests for the creative sync pipeline.
//!
//! - Identical re-syncs are unchanged and make no agent call
//! - Patch mode touches only supplied fields
//! - Principals never see or overwrite each other's creatives
//! - One failing creative never affects the rest of the batch
//! - Agent outages fail closed
//! - A write that lands during the agent call fails the item
//! - Assignment modes, dry runs and AI review dispatch

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use salesagent_agents::{
    AgentError, BuildRequest, BuildResult, CreativeAgentClient, CreativeAgentRegistry,
    PreviewResult,
};
use salesagent_core::agent::AgentDescriptor;
use salesagent_core::approval::ReviewDecision;
use salesagent_core::format::FormatSpec;
use salesagent_core::sync::{SyncAction, ValidationMode};
use salesagent_db::models::assignment::CreatePackage;
use salesagent_db::models::creative::{CreativeUpdate, NewCreative};
use salesagent_db::models::tenant::CreateTenant;
use salesagent_db::repositories::{AssignmentRepo, CreativeRepo, TenantRepo, WorkflowStepRepo};
use salesagent_pipeline::{
    CreativeRef, CreativeReviewer, CreativeSyncPipeline, Notifier, ReviewConfig, ReviewQueue,
    ReviewRequest, ReviewTaskState, ReviewVerdict, SyncConfig, SyncError, SyncOptions,
};
use salesagent_pipeline::reviewer::ReviewError;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const AGENT: &str = "https://agent.test";

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum PreviewMode {
    Ok,
    Empty,
    Down,
}

struct MockAgent {
    preview_mode: Mutex<PreviewMode>,
    preview_calls: AtomicUsize,
    build_calls: AtomicUsize,
    /// When set, the next preview writes creative `c1` itself before
    /// answering, as a concurrent sync would.
    competing_write: Mutex<Option<PgPool>>,
}

impl MockAgent {
    fn new(mode: PreviewMode) -> Self {
        Self {
            preview_mode: Mutex::new(mode),
            preview_calls: AtomicUsize::new(0),
            build_calls: AtomicUsize::new(0),
            competing_write: Mutex::new(None),
        }
    }

    fn write_during_next_preview(&self, pool: &PgPool) {
        *self.competing_write.lock().unwrap() = Some(pool.clone());
    }

    fn set_preview_mode(&self, mode: PreviewMode) {
        *self.preview_mode.lock().unwrap() = mode;
    }

    fn preview_calls(&self) -> usize {
        self.preview_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreativeAgentClient for MockAgent {
    async fn list_formats(&self, agent: &AgentDescriptor) -> Result<Vec<FormatSpec>, AgentError> {
        let wire = [
            json!({
                "format_id": {"agent_url": AGENT, "id": "display_300x250_image"},
                "name": "Medium Rectangle",
                "type": "display",
            }),
            json!({
                "format_id": {"agent_url": AGENT, "id": "display_300x250_generative"},
                "name": "Generative Medium Rectangle",
                "type": "display",
                "output_format_ids": [{"agent_url": AGENT, "id": "display_300x250_image"}],
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
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        let competing = self.competing_write.lock().unwrap().take();
        if let Some(pool) = competing {
            write_c1_elsewhere(&pool).await;
        }
        let mode = *self.preview_mode.lock().unwrap();
        match mode {
            PreviewMode::Ok => {
                let response = json!({
                    "previews": [{"renders": [{
                        "preview_url": "https://agent.test/preview/1",
                        "dimensions": {"width": 300, "height": 250},
                    }]}]
                });
                Ok(PreviewResult::from_response(
                    response.as_object().unwrap().clone(),
                ))
            }
            PreviewMode::Empty => Ok(PreviewResult::default()),
            PreviewMode::Down => Err(AgentError::Connection("connection refused".into())),
        }
    }

    async fn build(
        &self,
        _agent: &AgentDescriptor,
        request: &BuildRequest,
    ) -> Result<BuildResult, AgentError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        Ok(BuildResult {
            status: Some(if request.finalize { "completed" } else { "draft" }.into()),
            message: None,
            context_id: Some("ctx-1".into()),
            creative_output: Some(json!({
                "assets": {"image": {"url": "https://agent.test/generated.png"}}
            })),
        })
    }
}

/// Updates `c1` if it exists, creates it otherwise.
async fn write_c1_elsewhere(pool: &PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    match CreativeRepo::find_owned(pool, "t1", "p1", "c1").await.unwrap() {
        Some(row) => {
            CreativeRepo::update(
                &mut *conn,
                row.id,
                &CreativeUpdate {
                    name: "Edited elsewhere",
                    agent_url: &row.agent_url,
                    format: &row.format,
                    status: &row.status,
                    data: &row.data,
                },
            )
            .await
            .unwrap();
        }
        None => {
            CreativeRepo::insert(
                &mut *conn,
                &NewCreative {
                    tenant_id: "t1",
                    principal_id: "p1",
                    creative_id: "c1",
                    name: "Created elsewhere",
                    agent_url: AGENT,
                    format: "display_300x250_image",
                    status: "pending",
                    data: &json!({}),
                },
            )
            .await
            .unwrap();
        }
    }
}

struct ApprovingReviewer;

#[async_trait]
impl CreativeReviewer for ApprovingReviewer {
    async fn review(
        &self,
        _request: &ReviewRequest,
    ) -> Result<ReviewVerdict, salesagent_pipeline::reviewer::ReviewError> {
        Ok(ReviewVerdict {
            decision: ReviewDecision::Approve,
            confidence: 0.95,
            reason: "Brand safe".into(),
        })
    }
}

struct FailingReviewer;

#[async_trait]
impl CreativeReviewer for FailingReviewer {
    async fn review(&self, _request: &ReviewRequest) -> Result<ReviewVerdict, ReviewError> {
        Err(ReviewError::InvalidResponse("model unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_tenant(pool: &PgPool, approval_mode: &str) {
    TenantRepo::create(
        pool,
        &CreateTenant {
            tenant_id: "t1".into(),
            name: "Tenant One".into(),
            approval_mode: Some(approval_mode.into()),
            creative_review_criteria: None,
            slack_webhook_url: None,
        },
    )
    .await
    .unwrap();
}

fn pipeline_with(
    pool: &PgPool,
    mode: PreviewMode,
    config: SyncConfig,
) -> (CreativeSyncPipeline, Arc<MockAgent>) {
    let agent = Arc::new(MockAgent::new(mode));
    let registry = CreativeAgentRegistry::new(agent.clone(), AgentDescriptor::system_default(AGENT));
    let pipeline = CreativeSyncPipeline::new(pool.clone(), Arc::new(registry), config);
    (pipeline, agent)
}

fn pipeline(pool: &PgPool, mode: PreviewMode) -> (CreativeSyncPipeline, Arc<MockAgent>) {
    pipeline_with(pool, mode, SyncConfig::default())
}

fn banner(creative_id: &str) -> Value {
    json!({
        "creative_id": creative_id,
        "name": "Banner",
        "format_id": {"agent_url": AGENT, "id": "display_300x250_image"},
        "url": "https://cdn.example/banner.png",
        "width": 300,
        "height": 250,
    })
}

// ---------------------------------------------------------------------------
// Test: upsert semantics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_identical_resync_is_unchanged(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Ok);

    let first = pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(first.creatives[0].action, SyncAction::Created);
    assert_eq!(first.creatives[0].status.as_deref(), Some("pending"));
    assert_eq!(agent.preview_calls(), 1);

    let second = pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(second.creatives[0].action, SyncAction::Unchanged);
    assert!(second.creatives[0].changes.is_empty());
    assert_eq!(second.summary.unchanged, 1);
    assert_eq!(agent.preview_calls(), 1);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.data["preview_url"], "https://agent.test/preview/1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_keeps_unsupplied_fields(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);
    pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();

    let patch = SyncOptions {
        patch: true,
        ..Default::default()
    };
    let outcome = pipeline
        .sync("t1", "p1", vec![json!({"creative_id": "c1", "name": "Renamed"})], patch)
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.action, SyncAction::Updated);
    assert_eq!(result.changes, vec!["name".to_string()]);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.data["width"], 300);
    assert_eq!(stored.data["height"], 250);
    assert_eq!(stored.data["url"], "https://cdn.example/banner.png");
    assert_eq!(stored.version, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_upsert_clears_unsupplied_fields(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);
    pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();

    let mut replacement = banner("c1");
    replacement.as_object_mut().unwrap().remove("width");
    let outcome = pipeline
        .sync("t1", "p1", vec![replacement], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.creatives[0].changes, vec!["width".to_string()]);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.data.get("width").is_none());
    assert_eq!(stored.data["height"], 250);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_principals_are_isolated(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);
    pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();

    let mut other = banner("c1");
    other["name"] = json!("Someone else's banner");
    let outcome = pipeline
        .sync("t1", "p2", vec![other], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.creatives[0].action, SyncAction::Created);

    let mine = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mine.name, "Banner");
    assert_eq!(mine.version, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_id_is_generated(pool: PgPool) {
    seed_tenant(&pool, "auto-approve").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);

    let mut creative = banner("ignored");
    creative.as_object_mut().unwrap().remove("creative_id");
    let outcome = pipeline
        .sync("t1", "p1", vec![creative], SyncOptions::default())
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.action, SyncAction::Created);
    assert_eq!(result.status.as_deref(), Some("approved"));
    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", &result.creative_id)
        .await
        .unwrap()
        .is_some());
}

// ---------------------------------------------------------------------------
// Test: failure isolation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_item_does_not_affect_batch(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);

    let batch = vec![
        banner("good-1"),
        json!({"creative_id": "bad", "name": "No format"}),
        json!({"creative_id": "unknown", "name": "X", "format_id": "does_not_exist"}),
        banner("good-2"),
    ];
    let outcome = pipeline
        .sync("t1", "p1", batch, SyncOptions::default())
        .await
        .unwrap();

    let actions: Vec<_> = outcome.creatives.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            SyncAction::Created,
            SyncAction::Failed,
            SyncAction::Failed,
            SyncAction::Created
        ]
    );
    assert!(outcome.creatives[1].errors[0].contains("format_id is required"));
    assert!(outcome.creatives[2].errors[0].contains("does_not_exist"));
    assert_eq!(outcome.summary.created, 2);
    assert_eq!(outcome.summary.failed, 2);

    for id in ["good-1", "good-2"] {
        assert!(CreativeRepo::find_owned(&pool, "t1", "p1", id)
            .await
            .unwrap()
            .is_some());
    }
    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", "bad")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_agent_outage_fails_closed(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Down);

    let outcome = pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.action, SyncAction::Failed);
    assert!(result.errors[0].contains("retry"));
    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_preview_accepted_with_media_url(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Empty);

    let mut without_url = banner("no-url");
    without_url.as_object_mut().unwrap().remove("url");
    let outcome = pipeline
        .sync(
            "t1",
            "p1",
            vec![banner("with-url"), without_url],
            SyncOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.creatives[0].action, SyncAction::Created);
    assert_eq!(outcome.creatives[0].status.as_deref(), Some("pending"));
    assert_eq!(outcome.creatives[1].action, SyncAction::Failed);
    assert_eq!(agent.preview_calls(), 2);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "with-url")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["url"], "https://cdn.example/banner.png");
    assert!(stored.data.get("preview_url").is_none());

    // The agent recovering does not re-preview an unchanged creative.
    agent.set_preview_mode(PreviewMode::Ok);
    let again = pipeline
        .sync("t1", "p1", vec![banner("with-url")], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(again.creatives[0].action, SyncAction::Unchanged);
    assert_eq!(agent.preview_calls(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blank_context_is_rejected(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);

    assert_matches!(
        pipeline.sync("", "p1", vec![], SyncOptions::default()).await,
        Err(SyncError::MissingTenant)
    );
    assert_matches!(
        pipeline.sync("t1", " ", vec![], SyncOptions::default()).await,
        Err(SyncError::MissingPrincipal)
    );
    assert_matches!(
        pipeline.sync("nope", "p1", vec![], SyncOptions::default()).await,
        Err(SyncError::UnknownTenant(_))
    );
}

// ---------------------------------------------------------------------------
// Test: generative formats
// ---------------------------------------------------------------------------

fn generative(creative_id: &str) -> Value {
    json!({
        "creative_id": creative_id,
        "name": "Summer sale",
        "format_id": {"agent_url": AGENT, "id": "display_300x250_generative"},
        "assets": {"message": "Bright summer sale banner"},
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_generative_without_key_fails(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Ok);

    let outcome = pipeline
        .sync("t1", "p1", vec![generative("g1")], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.creatives[0].action, SyncAction::Failed);
    assert!(outcome.creatives[0].errors[0].contains("generation API key"));
    assert_eq!(agent.build_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_generative_build_records_context(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let config = SyncConfig::default().with_generation_api_key(Some("key".into()));
    let (pipeline, agent) = pipeline_with(&pool, PreviewMode::Ok, config);

    pipeline
        .sync("t1", "p1", vec![generative("g1")], SyncOptions::default())
        .await
        .unwrap();
    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "g1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["generative_context_id"], "ctx-1");
    assert_eq!(stored.data["generative_status"], "draft");
    assert_eq!(stored.data["generated_url"], "https://agent.test/generated.png");

    // Approval finalizes even though no buyer field changed.
    let mut approved = generative("g1");
    approved["approved"] = json!(true);
    let outcome = pipeline
        .sync("t1", "p1", vec![approved], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.creatives[0].action, SyncAction::Updated);
    assert_eq!(agent.build_calls.load(Ordering::SeqCst), 2);
    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "g1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["generative_status"], "completed");
    assert_eq!(agent.preview_calls(), 0);
}

// ---------------------------------------------------------------------------
// Test: assignments and dry run
// ---------------------------------------------------------------------------

async fn seed_package(pool: &PgPool) {
    AssignmentRepo::create_package(
        pool,
        &CreatePackage {
            tenant_id: "t1".into(),
            principal_id: "p1".into(),
            media_buy_id: "mb1".into(),
            package_id: "pkg_1".into(),
            buyer_ref: Some("buyer-pkg".into()),
        },
    )
    .await
    .unwrap();
}

fn assignments(creative_id: &str, refs: &[&str]) -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(
        creative_id.to_string(),
        refs.iter().map(|r| r.to_string()).collect(),
    )])
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lenient_assignment_reports_missing_packages(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    seed_package(&pool).await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);

    let options = SyncOptions {
        assignments: assignments("c1", &["buyer-pkg", "pkg_missing"]),
        validation_mode: ValidationMode::Lenient,
        ..Default::default()
    };
    let outcome = pipeline
        .sync("t1", "p1", vec![banner("c1")], options)
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.assigned_to, vec!["pkg_1".to_string()]);
    assert_eq!(
        result.assignment_errors.get("pkg_missing").map(String::as_str),
        Some("package not found")
    );

    let links = AssignmentRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].package_id, "pkg_1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_strict_assignment_aborts(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    seed_package(&pool).await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);

    let options = SyncOptions {
        assignments: assignments("c1", &["pkg_1", "pkg_missing"]),
        ..Default::default()
    };
    let err = pipeline
        .sync("t1", "p1", vec![banner("c1")], options)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        SyncError::AssignmentResolution { ref package_id, .. } if package_id == "pkg_missing"
    );
    assert!(AssignmentRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dry_run_writes_nothing(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    seed_package(&pool).await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Ok);

    let options = SyncOptions {
        dry_run: true,
        assignments: assignments("c1", &["pkg_1"]),
        ..Default::default()
    };
    let outcome = pipeline
        .sync("t1", "p1", vec![banner("c1")], options)
        .await
        .unwrap();
    assert!(outcome.dry_run);
    assert_eq!(outcome.creatives[0].action, SyncAction::Created);
    assert_eq!(outcome.creatives[0].assigned_to, vec!["pkg_1".to_string()]);
    assert_eq!(agent.preview_calls(), 1);

    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .is_none());
    assert!(AssignmentRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap()
        .is_empty());
    assert!(WorkflowStepRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Test: concurrent writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_during_agent_call_fails_item(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Ok);
    pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();

    agent.write_during_next_preview(&pool);
    let mut renamed = banner("c1");
    renamed["name"] = json!("Renamed");
    let outcome = pipeline
        .sync("t1", "p1", vec![renamed], SyncOptions::default())
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.action, SyncAction::Failed);
    assert!(result.errors[0].contains("modified concurrently"), "{:?}", result.errors);
    assert_eq!(outcome.summary.failed, 1);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Edited elsewhere");
    assert_eq!(stored.version, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_during_agent_call_fails_item(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, agent) = pipeline(&pool, PreviewMode::Ok);

    agent.write_during_next_preview(&pool);
    let outcome = pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();
    let result = &outcome.creatives[0];
    assert_eq!(result.action, SyncAction::Failed);
    assert!(result.errors[0].contains("modified concurrently"), "{:?}", result.errors);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Created elsewhere");
    assert_eq!(stored.version, 1);
}

// ---------------------------------------------------------------------------
// Test: post-processing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_creative_gets_workflow_step(pool: PgPool) {
    seed_tenant(&pool, "require-human").await;
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);
    pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();

    let steps = WorkflowStepRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap();
    assert_eq!(steps.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ai_review_applies_decision(pool: PgPool) {
    seed_tenant(&pool, "ai-powered").await;
    let cancel = CancellationToken::new();
    let (queue, handles) = ReviewQueue::start(
        pool.clone(),
        Arc::new(ApprovingReviewer),
        Notifier::disabled(),
        &ReviewConfig::default(),
        cancel.clone(),
    );
    let (pipeline, _agent) = pipeline(&pool, PreviewMode::Ok);
    let pipeline = pipeline.with_review_queue(queue.clone());

    let outcome = pipeline
        .sync("t1", "p1", vec![banner("c1")], SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.creatives[0].status.as_deref(), Some("pending"));

    let mut finished = None;
    for _ in 0..100 {
        let states = queue.states().await;
        if let Some(state) = states.values().find(|s| s.is_finished()) {
            finished = Some(state.clone());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_matches!(finished, Some(ReviewTaskState::Completed(ref o)) if o.applied);

    let stored = CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "approved");
    assert_eq!(stored.data["ai_review"]["decision"], "approve");

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_review_queue_keeps_only_recent_finished_tasks(pool: PgPool) {
    let cancel = CancellationToken::new();
    let config = ReviewConfig {
        retain_finished: 5,
        ..ReviewConfig::default()
    };
    let (queue, handles) = ReviewQueue::start(
        pool.clone(),
        Arc::new(FailingReviewer),
        Notifier::disabled(),
        &config,
        cancel.clone(),
    );

    let mut ids = Vec::new();
    for n in 0..50 {
        let request = ReviewRequest {
            creative: CreativeRef {
                id: n,
                tenant_id: "t1".into(),
                principal_id: "p1".into(),
                creative_id: format!("c{n}"),
                name: "Banner".into(),
                agent_url: AGENT.into(),
                format_id: "display_300x250_image".into(),
            },
            creative_data: json!({}),
            review_criteria: None,
            webhook_url: None,
        };
        ids.push(queue.submit(request).await.unwrap());
    }

    // Every task was queued before this point, so five finished entries
    // and nothing else means the queue has drained.
    let all_finished =
        |states: &HashMap<Uuid, ReviewTaskState>| states.values().all(|s| s.is_finished());
    for _ in 0..100 {
        let states = queue.states().await;
        if states.len() == 5 && all_finished(&states) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let states = queue.states().await;
    assert_eq!(states.len(), 5);
    assert!(states.values().all(|s| matches!(s, ReviewTaskState::Failed { .. })));
    assert!(queue.state(ids[0]).await.is_none());

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}
