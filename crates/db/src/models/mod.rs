//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the sync core creates rows

pub mod assignment;
pub mod creative;
pub mod creative_agent;
pub mod tenant;
pub mod workflow_step;
