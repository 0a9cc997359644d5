use axum::routing::{get, post};
use axum::Router;

use crate::handlers::creatives;
use crate::state::AppState;

/// Mounted under `/tenants/{tenant_id}`.
///
/// ```text
/// GET  /principals/{principal_id}/creatives        -> list_creatives
/// POST /principals/{principal_id}/creatives/sync   -> sync_creatives
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/principals/{principal_id}/creatives",
            get(creatives::list_creatives),
        )
        .route(
            "/principals/{principal_id}/creatives/sync",
            post(creatives::sync_creatives),
        )
}
