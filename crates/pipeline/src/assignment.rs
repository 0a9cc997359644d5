//! Assignment phase: link synced creatives to media-buy packages.
//!
//! Runs in its own transaction after every creative upsert has finished.
//! Package references match the server-generated `package_id` or the
//! buyer's `buyer_ref`, scoped to the calling principal.

use std::collections::BTreeMap;

use salesagent_core::sync::{SyncResult, ValidationMode};
use salesagent_db::repositories::AssignmentRepo;
use salesagent_db::DbPool;

use crate::error::SyncError;

const ERR_PACKAGE_NOT_FOUND: &str = "package not found";
const ERR_CREATIVE_NOT_SYNCED: &str = "creative failed to sync";

/// Apply `assignments` (creative id -> package references) and record the
/// outcome on each creative's result.
///
/// Strict mode returns the first unresolvable package as an error and
/// writes no assignments. Lenient mode records it per creative and goes on.
pub async fn assign_creatives(
    pool: &DbPool,
    tenant_id: &str,
    principal_id: &str,
    assignments: &BTreeMap<String, Vec<String>>,
    results: &mut [SyncResult],
    mode: ValidationMode,
    dry_run: bool,
) -> Result<(), SyncError> {
    let mut tx = pool.begin().await?;

    for (creative_id, package_refs) in assignments {
        let Some(result) = results.iter_mut().find(|r| &r.creative_id == creative_id) else {
            if mode == ValidationMode::Strict {
                return Err(SyncError::AssignmentResolution {
                    creative_id: creative_id.clone(),
                    package_id: package_refs.first().cloned().unwrap_or_default(),
                });
            }
            tracing::warn!(creative_id, "Assignment names a creative that is not in this sync");
            continue;
        };

        if result.is_failed() {
            for package_ref in package_refs {
                result
                    .assignment_errors
                    .insert(package_ref.clone(), ERR_CREATIVE_NOT_SYNCED.to_string());
            }
            continue;
        }

        for package_ref in package_refs {
            let package =
                AssignmentRepo::resolve_package(&mut *tx, tenant_id, principal_id, package_ref)
                    .await?;
            let Some(package) = package else {
                if mode == ValidationMode::Strict {
                    return Err(SyncError::AssignmentResolution {
                        creative_id: creative_id.clone(),
                        package_id: package_ref.clone(),
                    });
                }
                result
                    .assignment_errors
                    .insert(package_ref.clone(), ERR_PACKAGE_NOT_FOUND.to_string());
                continue;
            };

            if !dry_run {
                AssignmentRepo::create_assignment(&mut *tx, &package, creative_id).await?;
            }
            result.assigned_to.push(package.package_id.clone());
        }
    }

    if dry_run {
        tx.rollback().await?;
    } else {
        tx.commit().await?;
    }
    Ok(())
}
