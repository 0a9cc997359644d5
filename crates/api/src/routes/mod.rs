pub mod creatives;
pub mod formats;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tenants/{tenant_id}/formats                                   list, search
/// /tenants/{tenant_id}/principals/{principal_id}/creatives       list
/// /tenants/{tenant_id}/principals/{principal_id}/creatives/sync  sync (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest(
        "/tenants/{tenant_id}",
        formats::router().merge(creatives::router()),
    )
}
