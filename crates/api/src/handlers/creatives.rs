//! Creative listing and batch sync for a principal.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use salesagent_db::repositories::CreativeRepo;
use salesagent_pipeline::SyncOptions;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a sync call. Options sit next to `creatives`.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub creatives: Vec<Value>,
    #[serde(flatten)]
    pub options: SyncOptions,
}

/// GET /api/v1/tenants/{tenant_id}/principals/{principal_id}/creatives
pub async fn list_creatives(
    State(state): State<AppState>,
    Path((tenant_id, principal_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let creatives = CreativeRepo::list_for_principal(&state.pool, &tenant_id, &principal_id).await?;
    Ok(Json(DataResponse { data: creatives }))
}

/// POST /api/v1/tenants/{tenant_id}/principals/{principal_id}/creatives/sync
///
/// Per-creative failures come back inside `data.creatives`; only
/// batch-level failures produce an error status.
pub async fn sync_creatives(
    State(state): State<AppState>,
    Path((tenant_id, principal_id)): Path<(String, String)>,
    Json(request): Json<SyncRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .pipeline
        .sync(&tenant_id, &principal_id, request.creatives, request.options)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}
