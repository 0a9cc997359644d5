//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! that stand alone accept `&PgPool`; writes that must join a caller's
//! transaction accept `&mut PgConnection` (pass `&mut *tx`).

pub mod assignment_repo;
pub mod creative_agent_repo;
pub mod creative_repo;
pub mod tenant_repo;
pub mod workflow_step_repo;

pub use assignment_repo::AssignmentRepo;
pub use creative_agent_repo::CreativeAgentRepo;
pub use creative_repo::CreativeRepo;
pub use tenant_repo::TenantRepo;
pub use workflow_step_repo::WorkflowStepRepo;
