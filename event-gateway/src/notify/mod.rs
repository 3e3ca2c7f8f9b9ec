//! Alert channel for rejected events.
//!
//! Alerts are best effort: the gateway logs and drops notifier failures.

pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

pub use slack::SlackNotifier;

/// Reasons an alert could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification endpoint returned status {0}")]
    Status(u16),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Sink for human-readable alert text.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`.
    async fn notify(&self, channel: &str, text: &str) -> Result<(), NotifyError>;
}
