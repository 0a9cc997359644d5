//! Creative sync pipeline.
//!
//! One call syncs a batch of creatives for a principal:
//!
//! 1. Prefetch every format the tenant can use, once, outside any
//!    transaction.
//! 2. Per creative: parse and validate, merge onto the stored record,
//!    validate against the owning agent (preview or build), then write in
//!    a transaction of its own. A failure affects only that creative.
//! 3. Assignment phase in a separate transaction.
//! 4. Post-processing for creatives left pending.
//!
//! Agent calls never run inside a transaction. The stored row's `version`
//! is read before the agent call and re-checked under `FOR UPDATE` before
//! writing, so a concurrent sync of the same creative fails instead of
//! being silently overwritten.

use std::collections::BTreeMap;
use std::sync::Arc;

use salesagent_agents::CreativeAgentRegistry;
use salesagent_core::approval::ApprovalMode;
use salesagent_core::creative::{
    generate_creative_id, raw_creative_id, CreativeFields, CreativeInput, MergeMode,
    ResolvedFormat, STATUS_PENDING,
};
use salesagent_core::sync::{SyncAction, SyncResult, SyncSummary, ValidationMode};
use salesagent_db::models::creative::{Creative, CreativeUpdate, NewCreative};
use salesagent_db::repositories::{CreativeRepo, TenantRepo};
use salesagent_db::DbPool;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::assignment::assign_creatives;
use crate::catalog::FormatCatalog;
use crate::config::SyncConfig;
use crate::error::{ItemError, SyncError};
use crate::notify::{CreativeRef, Notifier};
use crate::post::{process_pending, PendingCreative};
use crate::review::ReviewQueue;
use crate::validate::{apply_derived, validate_with_agent};

/// Per-call options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Merge only supplied fields into existing creatives.
    pub patch: bool,
    /// Creative id -> package ids or buyer refs.
    pub assignments: BTreeMap<String, Vec<String>>,
    /// Validate and report without persisting anything.
    pub dry_run: bool,
    pub validation_mode: ValidationMode,
}

/// Everything a sync call returns.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub creatives: Vec<SyncResult>,
    pub summary: SyncSummary,
    pub dry_run: bool,
}

/// Successful per-item write.
struct ItemOutcome {
    action: SyncAction,
    status: String,
    changes: Vec<String>,
    pending: Option<PendingCreative>,
}

/// Values fixed for the whole batch.
struct BatchContext<'a> {
    tenant_id: &'a str,
    principal_id: &'a str,
    mode: MergeMode,
    approval_mode: ApprovalMode,
    dry_run: bool,
    catalog: &'a FormatCatalog,
}

pub struct CreativeSyncPipeline {
    pool: DbPool,
    registry: Arc<CreativeAgentRegistry>,
    config: SyncConfig,
    review_queue: Option<ReviewQueue>,
    notifier: Notifier,
}

impl CreativeSyncPipeline {
    pub fn new(pool: DbPool, registry: Arc<CreativeAgentRegistry>, config: SyncConfig) -> Self {
        Self {
            pool,
            registry,
            config,
            review_queue: None,
            notifier: Notifier::disabled(),
        }
    }

    pub fn with_review_queue(mut self, queue: ReviewQueue) -> Self {
        self.review_queue = Some(queue);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sync a batch. Returns one result per input creative.
    ///
    /// Per-item problems never surface as `Err`; only missing tenant or
    /// principal context, a strict-mode assignment failure, or a database
    /// failure outside any item do.
    pub async fn sync(
        &self,
        tenant_id: &str,
        principal_id: &str,
        creatives: Vec<Value>,
        options: SyncOptions,
    ) -> Result<SyncOutcome, SyncError> {
        if tenant_id.trim().is_empty() {
            return Err(SyncError::MissingTenant);
        }
        if principal_id.trim().is_empty() {
            return Err(SyncError::MissingPrincipal);
        }
        let tenant = TenantRepo::find_by_tenant_id(&self.pool, tenant_id)
            .await?
            .ok_or_else(|| SyncError::UnknownTenant(tenant_id.to_string()))?;
        let approval_mode = tenant.approval_mode();

        // Legacy id resolution below reads the disk catalog from memory.
        self.registry.load_offline_catalog().await;
        let catalog = FormatCatalog::new(
            self.registry.list_all_formats(Some(tenant_id), false).await,
            self.registry.offline_store().cloned(),
        );
        tracing::info!(
            tenant_id,
            principal_id,
            creatives = creatives.len(),
            formats = catalog.len(),
            patch = options.patch,
            dry_run = options.dry_run,
            "Syncing creatives"
        );

        let ctx = BatchContext {
            tenant_id,
            principal_id,
            mode: MergeMode::from_patch_flag(options.patch),
            approval_mode,
            dry_run: options.dry_run,
            catalog: &catalog,
        };

        let mut results = Vec::with_capacity(creatives.len());
        let mut pending = Vec::new();
        for raw in &creatives {
            let (creative_id, outcome) = self.sync_item(&ctx, raw).await;
            match outcome {
                Ok(item) => {
                    pending.extend(item.pending);
                    results.push(SyncResult::succeeded(
                        creative_id,
                        item.action,
                        item.status,
                        item.changes,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        tenant_id,
                        principal_id,
                        creative_id = %creative_id,
                        error = %e,
                        "Creative sync failed"
                    );
                    results.push(SyncResult::failed(creative_id, e.to_string()));
                }
            }
        }

        if !options.assignments.is_empty() {
            assign_creatives(
                &self.pool,
                tenant_id,
                principal_id,
                &options.assignments,
                &mut results,
                options.validation_mode,
                options.dry_run,
            )
            .await?;
        }

        if !options.dry_run {
            process_pending(
                &self.pool,
                &tenant,
                approval_mode,
                self.review_queue.as_ref(),
                &self.notifier,
                pending,
            )
            .await;
        }

        let summary = SyncSummary::from_results(&results);
        tracing::info!(
            tenant_id,
            principal_id,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Creative sync finished"
        );
        Ok(SyncOutcome {
            creatives: results,
            summary,
            dry_run: options.dry_run,
        })
    }

    /// Sync one creative. The returned id is the input's, or a generated
    /// one when the input had none.
    async fn sync_item(
        &self,
        ctx: &BatchContext<'_>,
        raw: &Value,
    ) -> (String, Result<ItemOutcome, ItemError>) {
        let input = match CreativeInput::from_value(raw) {
            Ok(input) => input,
            Err(e) => {
                let id = raw_creative_id(raw).unwrap_or_else(generate_creative_id);
                return (id, Err(e.into()));
            }
        };
        let creative_id = input
            .creative_id
            .clone()
            .unwrap_or_else(generate_creative_id);
        let outcome = self.upsert(ctx, &creative_id, &input).await;
        (creative_id, outcome)
    }

    async fn upsert(
        &self,
        ctx: &BatchContext<'_>,
        creative_id: &str,
        input: &CreativeInput,
    ) -> Result<ItemOutcome, ItemError> {
        let existing =
            CreativeRepo::find_owned(&self.pool, ctx.tenant_id, ctx.principal_id, creative_id)
                .await?;
        input.validate_for(ctx.mode, existing.is_some())?;

        let requested = input
            .format
            .as_ref()
            .map(|reference| ctx.catalog.resolve(reference))
            .transpose()?;
        let resolved = requested.map(|f| ResolvedFormat {
            agent_url: f.agent_url.clone(),
            format_id: f.format_id.clone(),
        });

        let (fields, changes) = match (&existing, &resolved) {
            (Some(row), _) => row.fields().merge(input, resolved.as_ref(), ctx.mode),
            (None, Some(format)) => (CreativeFields::for_create(input, format), Vec::new()),
            (None, None) => {
                return Err(ItemError::Validation("format_id is required".to_string()));
            }
        };

        let format = match requested {
            Some(format) => format,
            None => ctx
                .catalog
                .find(&fields.agent_url, &fields.format_id)
                .ok_or_else(|| ItemError::FormatNotFound(fields.format_id.clone()))?,
        };

        // Nothing to write: skip the agent round-trip as well, unless a
        // generative build was asked to refine or finalize.
        let refines = input.context_id.is_some() || input.approved == Some(true);
        if let Some(row) = &existing {
            if changes.is_empty() && !(format.is_generative() && refines) {
                return Ok(ItemOutcome {
                    action: SyncAction::Unchanged,
                    status: row.status.clone(),
                    changes: Vec::new(),
                    pending: None,
                });
            }
        }

        let derived = validate_with_agent(
            &self.registry,
            &self.config,
            format,
            &fields,
            input,
            existing.as_ref().and_then(Creative::generative_context_id),
        )
        .await?;

        let status = ctx.approval_mode.initial_status();
        let mut tx = self.pool.begin().await?;

        let (row, action) = match &existing {
            None => {
                let mut data = Map::new();
                fields.write_into(&mut data);
                apply_derived(&mut data, derived);
                let data = Value::Object(data);
                let row = CreativeRepo::insert(
                    &mut *tx,
                    &NewCreative {
                        tenant_id: ctx.tenant_id,
                        principal_id: ctx.principal_id,
                        creative_id,
                        name: &fields.name,
                        agent_url: &fields.agent_url,
                        format: &fields.format_id,
                        status,
                        data: &data,
                    },
                )
                .await
                .map_err(conflict_or_database)?;
                (row, SyncAction::Created)
            }
            Some(observed) => {
                let locked = CreativeRepo::find_owned_for_update(
                    &mut *tx,
                    ctx.tenant_id,
                    ctx.principal_id,
                    creative_id,
                )
                .await?
                .ok_or(ItemError::ConcurrentModification)?;
                if locked.version != observed.version {
                    return Err(ItemError::ConcurrentModification);
                }

                let mut data = locked.data.as_object().cloned().unwrap_or_default();
                fields.write_into(&mut data);
                apply_derived(&mut data, derived);
                let data = Value::Object(data);
                let row = CreativeRepo::update(
                    &mut *tx,
                    locked.id,
                    &CreativeUpdate {
                        name: &fields.name,
                        agent_url: &fields.agent_url,
                        format: &fields.format_id,
                        status,
                        data: &data,
                    },
                )
                .await?;
                (row, SyncAction::Updated)
            }
        };

        if ctx.dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        tracing::debug!(
            creative_id,
            action = ?action,
            status,
            dry_run = ctx.dry_run,
            "Creative written"
        );

        let pending = (!ctx.dry_run && row.status == STATUS_PENDING).then(|| PendingCreative {
            creative: CreativeRef {
                id: row.id,
                tenant_id: row.tenant_id.clone(),
                principal_id: row.principal_id.clone(),
                creative_id: row.creative_id.clone(),
                name: row.name.clone(),
                agent_url: row.agent_url.clone(),
                format_id: row.format.clone(),
            },
            data: row.data.clone(),
        });

        Ok(ItemOutcome {
            action,
            status: row.status,
            changes: changes.into_iter().map(str::to_string).collect(),
            pending,
        })
    }
}

/// A unique violation on insert means another sync created the same
/// creative first.
fn conflict_or_database(err: sqlx::Error) -> ItemError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ItemError::ConcurrentModification,
        _ => ItemError::Database(err),
    }
}
