//! Repository for `media_buy_packages` and `creative_assignments`.

use sqlx::{PgConnection, PgPool};

use crate::models::assignment::{
    CreatePackage, CreativeAssignment, MediaBuyPackage, DEFAULT_ASSIGNMENT_WEIGHT,
};

/// Column list for `media_buy_packages` queries.
const PACKAGE_COLUMNS: &str = "\
    id, tenant_id, principal_id, media_buy_id, package_id, buyer_ref, \
    created_at, updated_at";

/// Column list for `creative_assignments` queries.
const ASSIGNMENT_COLUMNS: &str = "\
    id, assignment_id, tenant_id, principal_id, media_buy_id, package_id, \
    creative_id, weight, created_at, updated_at";

/// Provides package resolution and assignment writes.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Insert a media-buy package.
    pub async fn create_package(
        pool: &PgPool,
        input: &CreatePackage,
    ) -> Result<MediaBuyPackage, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_buy_packages \
                (tenant_id, principal_id, media_buy_id, package_id, buyer_ref) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PACKAGE_COLUMNS}"
        );
        sqlx::query_as::<_, MediaBuyPackage>(&query)
            .bind(&input.tenant_id)
            .bind(&input.principal_id)
            .bind(&input.media_buy_id)
            .bind(&input.package_id)
            .bind(input.buyer_ref.as_deref())
            .fetch_one(pool)
            .await
    }

    /// Resolve a package reference owned by the principal.
    ///
    /// Matches the server-generated `package_id` first, then the buyer's
    /// `buyer_ref`.
    pub async fn resolve_package(
        conn: &mut PgConnection,
        tenant_id: &str,
        principal_id: &str,
        reference: &str,
    ) -> Result<Option<MediaBuyPackage>, sqlx::Error> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM media_buy_packages \
             WHERE tenant_id = $1 AND principal_id = $2 \
               AND (package_id = $3 OR buyer_ref = $3) \
             ORDER BY (package_id = $3) DESC, id \
             LIMIT 1"
        );
        sqlx::query_as::<_, MediaBuyPackage>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(reference)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Link a creative to a package. Returns `None` when the link already
    /// existed.
    pub async fn create_assignment(
        conn: &mut PgConnection,
        package: &MediaBuyPackage,
        creative_id: &str,
    ) -> Result<Option<CreativeAssignment>, sqlx::Error> {
        let assignment_id = format!("assign_{}", uuid::Uuid::new_v4().simple());
        let query = format!(
            "INSERT INTO creative_assignments \
                (assignment_id, tenant_id, principal_id, media_buy_id, package_id, \
                 creative_id, weight) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT ON CONSTRAINT uq_creative_assignments_link DO NOTHING \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, CreativeAssignment>(&query)
            .bind(&assignment_id)
            .bind(&package.tenant_id)
            .bind(&package.principal_id)
            .bind(&package.media_buy_id)
            .bind(&package.package_id)
            .bind(creative_id)
            .bind(DEFAULT_ASSIGNMENT_WEIGHT)
            .fetch_optional(&mut *conn)
            .await
    }

    /// List all assignments of a creative within a tenant.
    pub async fn list_for_creative(
        pool: &PgPool,
        tenant_id: &str,
        creative_id: &str,
    ) -> Result<Vec<CreativeAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM creative_assignments \
             WHERE tenant_id = $1 AND creative_id = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, CreativeAssignment>(&query)
            .bind(tenant_id)
            .bind(creative_id)
            .fetch_all(pool)
            .await
    }
}
