//! Repository for the `creatives` table.
//!
//! Every lookup is scoped by `(tenant_id, principal_id, creative_id)`; a
//! principal can never read or overwrite another principal's creative.

use sqlx::{PgConnection, PgPool};
use salesagent_core::types::DbId;

use crate::models::creative::{Creative, CreativeUpdate, NewCreative};

/// Column list for `creatives` queries.
const COLUMNS: &str = "\
    id, tenant_id, principal_id, creative_id, name, agent_url, format, \
    status, data, version, created_at, updated_at";

/// Provides owner-scoped reads and transactional writes for creatives.
pub struct CreativeRepo;

impl CreativeRepo {
    /// Find a creative owned by `principal_id` within `tenant_id`.
    pub async fn find_owned(
        pool: &PgPool,
        tenant_id: &str,
        principal_id: &str,
        creative_id: &str,
    ) -> Result<Option<Creative>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM creatives \
             WHERE tenant_id = $1 AND principal_id = $2 AND creative_id = $3"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(creative_id)
            .fetch_optional(pool)
            .await
    }

    /// Same as [`find_owned`](Self::find_owned) but row-locks the creative
    /// for the rest of the caller's transaction.
    pub async fn find_owned_for_update(
        conn: &mut PgConnection,
        tenant_id: &str,
        principal_id: &str,
        creative_id: &str,
    ) -> Result<Option<Creative>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM creatives \
             WHERE tenant_id = $1 AND principal_id = $2 AND creative_id = $3 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(creative_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a creative by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Creative>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM creatives WHERE id = $1");
        sqlx::query_as::<_, Creative>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a principal's creatives, newest first.
    pub async fn list_for_principal(
        pool: &PgPool,
        tenant_id: &str,
        principal_id: &str,
    ) -> Result<Vec<Creative>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM creatives \
             WHERE tenant_id = $1 AND principal_id = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a new creative.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewCreative<'_>,
    ) -> Result<Creative, sqlx::Error> {
        let query = format!(
            "INSERT INTO creatives \
                (tenant_id, principal_id, creative_id, name, agent_url, format, status, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(input.tenant_id)
            .bind(input.principal_id)
            .bind(input.creative_id)
            .bind(input.name)
            .bind(input.agent_url)
            .bind(input.format)
            .bind(input.status)
            .bind(input.data)
            .fetch_one(&mut *conn)
            .await
    }

    /// Overwrite a creative's mutable columns and bump its version.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &CreativeUpdate<'_>,
    ) -> Result<Creative, sqlx::Error> {
        let query = format!(
            "UPDATE creatives SET \
                name = $2, agent_url = $3, format = $4, status = $5, data = $6, \
                version = version + 1 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(id)
            .bind(input.name)
            .bind(input.agent_url)
            .bind(input.format)
            .bind(input.status)
            .bind(input.data)
            .fetch_one(&mut *conn)
            .await
    }

    /// Apply an out-of-band review outcome to a still-pending creative.
    ///
    /// `data_patch` is merged into `data` at the top level. Returns `None`
    /// when the creative is gone or no longer pending (a human got there first).
    pub async fn apply_review(
        pool: &PgPool,
        id: DbId,
        status: &str,
        data_patch: &serde_json::Value,
    ) -> Result<Option<Creative>, sqlx::Error> {
        let query = format!(
            "UPDATE creatives SET \
                status = $2, data = data || $3, version = version + 1 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Creative>(&query)
            .bind(id)
            .bind(status)
            .bind(data_patch)
            .fetch_optional(pool)
            .await
    }
}
