//! Integration tests for the creative persistence layer.
//!
//! - Owner-scoped lookups never leak across principals
//! - Updates bump the optimistic-concurrency version
//! - Review outcomes only apply to pending creatives
//! - Package resolution by package_id or buyer_ref, and idempotent links

use serde_json::json;
use sqlx::PgPool;
use salesagent_db::models::assignment::CreatePackage;
use salesagent_db::models::creative::{CreativeUpdate, NewCreative};
use salesagent_db::models::creative_agent::CreateCreativeAgent;
use salesagent_db::models::tenant::CreateTenant;
use salesagent_db::repositories::{
    AssignmentRepo, CreativeAgentRepo, CreativeRepo, TenantRepo, WorkflowStepRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_tenant(pool: &PgPool, tenant_id: &str) {
    TenantRepo::create(
        pool,
        &CreateTenant {
            tenant_id: tenant_id.to_string(),
            name: format!("Tenant {tenant_id}"),
            approval_mode: None,
            creative_review_criteria: None,
            slack_webhook_url: None,
        },
    )
    .await
    .unwrap();
}

async fn insert_creative(pool: &PgPool, principal_id: &str, creative_id: &str) -> i64 {
    let data = json!({"url": "https://cdn.example/banner.png"});
    let mut conn = pool.acquire().await.unwrap();
    CreativeRepo::insert(
        &mut conn,
        &NewCreative {
            tenant_id: "t1",
            principal_id,
            creative_id,
            name: "Banner",
            agent_url: "https://creative.adcontextprotocol.org",
            format: "display_300x250_image",
            status: "pending",
            data: &data,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Test: tenants and agents
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_defaults_to_require_human(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    let tenant = TenantRepo::find_by_tenant_id(&pool, "t1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tenant.approval_mode, "require-human");
    assert!(TenantRepo::find_by_tenant_id(&pool, "nope")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_agents_listed_by_priority(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    for (url, priority) in [("https://late.example", Some(20)), ("https://early.example", Some(0))] {
        CreativeAgentRepo::create(
            &pool,
            &CreateCreativeAgent {
                tenant_id: "t1".into(),
                agent_url: url.into(),
                name: url.into(),
                enabled: None,
                priority,
                auth_type: Some("bearer".into()),
                auth_credentials: Some("tok".into()),
            },
        )
        .await
        .unwrap();
    }

    let agents = CreativeAgentRepo::list_for_tenant(&pool, "t1").await.unwrap();
    let urls: Vec<_> = agents.iter().map(|a| a.agent_url.as_str()).collect();
    assert_eq!(urls, vec!["https://early.example", "https://late.example"]);
    assert!(agents[0].enabled);
    assert!(agents[0].to_descriptor().auth.is_some());
}

// ---------------------------------------------------------------------------
// Test: creatives
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lookup_is_scoped_by_principal(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    insert_creative(&pool, "p1", "c1").await;

    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", "c1")
        .await
        .unwrap()
        .is_some());
    assert!(CreativeRepo::find_owned(&pool, "t1", "p2", "c1")
        .await
        .unwrap()
        .is_none());

    // Same creative_id under another principal is a separate record.
    insert_creative(&pool, "p2", "c1").await;
    assert_eq!(
        CreativeRepo::list_for_principal(&pool, "t1", "p1")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_bumps_version(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    let id = insert_creative(&pool, "p1", "c1").await;

    let mut tx = pool.begin().await.unwrap();
    let locked = CreativeRepo::find_owned_for_update(&mut tx, "t1", "p1", "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(locked.version, 1);

    let data = json!({"url": "https://cdn.example/v2.png"});
    let updated = CreativeRepo::update(
        &mut tx,
        id,
        &CreativeUpdate {
            name: "Banner v2",
            agent_url: &locked.agent_url,
            format: &locked.format,
            status: "approved",
            data: &data,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated.version, 2);
    assert_eq!(updated.name, "Banner v2");
    assert_eq!(updated.status, "approved");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rolled_back_insert_is_not_visible(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    let data = json!({});
    let mut tx = pool.begin().await.unwrap();
    CreativeRepo::insert(
        &mut tx,
        &NewCreative {
            tenant_id: "t1",
            principal_id: "p1",
            creative_id: "ghost",
            name: "Ghost",
            agent_url: "https://creative.adcontextprotocol.org",
            format: "display_300x250_image",
            status: "pending",
            data: &data,
        },
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    assert!(CreativeRepo::find_owned(&pool, "t1", "p1", "ghost")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_review_only_applies_to_pending(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    let id = insert_creative(&pool, "p1", "c1").await;

    let patch = json!({"ai_review": {"decision": "approve", "confidence": 0.95}});
    let reviewed = CreativeRepo::apply_review(&pool, id, "approved", &patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed.status, "approved");
    assert_eq!(reviewed.data["ai_review"]["decision"], "approve");
    // Existing keys survive the merge.
    assert_eq!(reviewed.data["url"], "https://cdn.example/banner.png");

    let again = CreativeRepo::apply_review(&pool, id, "rejected", &patch)
        .await
        .unwrap();
    assert!(again.is_none());
}

// ---------------------------------------------------------------------------
// Test: packages and assignments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_package_resolves_by_id_or_buyer_ref(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    AssignmentRepo::create_package(
        &pool,
        &CreatePackage {
            tenant_id: "t1".into(),
            principal_id: "p1".into(),
            media_buy_id: "mb1".into(),
            package_id: "pkg_1".into(),
            buyer_ref: Some("buyer-pkg-a".into()),
        },
    )
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let by_id = AssignmentRepo::resolve_package(&mut conn, "t1", "p1", "pkg_1")
        .await
        .unwrap();
    let by_ref = AssignmentRepo::resolve_package(&mut conn, "t1", "p1", "buyer-pkg-a")
        .await
        .unwrap();
    assert_eq!(by_id.unwrap().id, by_ref.unwrap().id);

    // Another principal cannot see the package.
    assert!(AssignmentRepo::resolve_package(&mut conn, "t1", "p2", "pkg_1")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assignment_link_is_idempotent(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    let package = AssignmentRepo::create_package(
        &pool,
        &CreatePackage {
            tenant_id: "t1".into(),
            principal_id: "p1".into(),
            media_buy_id: "mb1".into(),
            package_id: "pkg_1".into(),
            buyer_ref: None,
        },
    )
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let first = AssignmentRepo::create_assignment(&mut conn, &package, "c1")
        .await
        .unwrap();
    let second = AssignmentRepo::create_assignment(&mut conn, &package, "c1")
        .await
        .unwrap();
    assert!(first.is_some());
    assert!(second.is_none());

    let links = AssignmentRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].weight, 100);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_workflow_step_for_creative(pool: PgPool) {
    seed_tenant(&pool, "t1").await;
    WorkflowStepRepo::create_creative_approval(&pool, "t1", "p1", "c1", &json!({"name": "Banner"}))
        .await
        .unwrap();

    let steps = WorkflowStepRepo::list_for_creative(&pool, "t1", "c1")
        .await
        .unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_type, "creative_approval");
    assert_eq!(steps[0].status, "requires_approval");
}
