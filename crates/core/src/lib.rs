//! Domain types and pure logic for the creative sales agent.
//!
//! Nothing in this crate performs I/O. Format definitions, agent
//! descriptors, approval policy, creative input parsing, and the
//! patch/full-upsert merge rules all live here so that the registry,
//! the database layer and the sync pipeline share one vocabulary.

pub mod agent;
pub mod approval;
pub mod creative;
pub mod error;
pub mod format;
pub mod sync;
pub mod types;
