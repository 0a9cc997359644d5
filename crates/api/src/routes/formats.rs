use axum::routing::get;
use axum::Router;

use crate::handlers::formats;
use crate::state::AppState;

/// Mounted under `/tenants/{tenant_id}`.
///
/// ```text
/// GET /formats   -> list_formats
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/formats", get(formats::list_formats))
}
