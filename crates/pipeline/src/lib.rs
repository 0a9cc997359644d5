//! Creative sync pipeline: upserts buyer creatives against the formats their
//! creative agents publish, assigns them to packages, and routes pending
//! creatives to AI or human review.

pub mod agent_source;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod post;
pub mod review;
pub mod reviewer;
pub mod sync;
pub mod validate;

pub use agent_source::DbAgentSource;
pub use config::{ReviewConfig, SyncConfig};
pub use error::{ItemError, SyncError};
pub use notify::{CreativeRef, Notifier};
pub use review::{ReviewOutcome, ReviewQueue, ReviewTaskState};
pub use reviewer::{CreativeReviewer, GeminiReviewer, ReviewRequest, ReviewVerdict};
pub use sync::{CreativeSyncPipeline, SyncOptions, SyncOutcome};
