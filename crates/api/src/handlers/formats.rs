//! Format discovery across the tenant's creative agents.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use salesagent_core::error::CoreError;
use salesagent_core::format::{FormatFilter, FormatType};
use salesagent_db::repositories::TenantRepo;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FormatsQuery {
    /// Case-insensitive text match on id, name or description.
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub format_type: Option<String>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub is_responsive: Option<bool>,
    /// Bypass the in-memory TTL cache.
    #[serde(default)]
    pub refresh: bool,
}

impl FormatsQuery {
    fn filter(&self) -> FormatFilter {
        FormatFilter {
            format_type: self.format_type.as_deref().map(FormatType::parse),
            min_width: self.min_width,
            max_width: self.max_width,
            min_height: self.min_height,
            max_height: self.max_height,
            is_responsive: self.is_responsive,
            format_ids: Vec::new(),
        }
    }
}

/// GET /api/v1/tenants/{tenant_id}/formats
///
/// Every format offered by the default agent and the tenant's own agents,
/// in agent priority order, in wire shape.
pub async fn list_formats(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<FormatsQuery>,
) -> AppResult<impl IntoResponse> {
    TenantRepo::find_by_tenant_id(&state.pool, &tenant_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Tenant",
            id: tenant_id.clone(),
        })?;

    let formats = state
        .registry
        .list_all_formats(Some(&tenant_id), params.refresh)
        .await;
    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let data: Vec<Value> = params
        .filter()
        .apply(formats)
        .into_iter()
        .filter(|f| query.map_or(true, |q| f.matches_query(q)))
        .map(|f| f.to_wire())
        .collect();

    tracing::debug!(tenant_id, count = data.len(), "Listed formats");
    Ok(Json(DataResponse { data }))
}
