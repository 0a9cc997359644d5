//! Outbound notifications for the creative workflow.
//!
//! - [`PlatformEvent`] is the notification envelope.
//! - [`delivery::webhook`] posts events to tenant webhooks (Slack-compatible)
//!   with retry.

pub mod delivery;
pub mod event;

pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use event::PlatformEvent;
