//! Media-buy packages and creative-to-package assignments.

use salesagent_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default delivery weight for a new assignment.
pub const DEFAULT_ASSIGNMENT_WEIGHT: i32 = 100;

/// A row from the `media_buy_packages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaBuyPackage {
    pub id: DbId,
    pub tenant_id: String,
    pub principal_id: String,
    pub media_buy_id: String,
    /// Server-generated package id.
    pub package_id: String,
    /// Buyer-supplied package reference.
    pub buyer_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a package (written by the media-buy flow and tests).
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackage {
    pub tenant_id: String,
    pub principal_id: String,
    pub media_buy_id: String,
    pub package_id: String,
    pub buyer_ref: Option<String>,
}

/// A row from the `creative_assignments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreativeAssignment {
    pub id: DbId,
    pub assignment_id: String,
    pub tenant_id: String,
    pub principal_id: String,
    pub media_buy_id: String,
    pub package_id: String,
    pub creative_id: String,
    pub weight: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
