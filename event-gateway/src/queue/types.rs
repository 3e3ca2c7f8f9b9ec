//! Publish acknowledgment and failure types.

use thiserror::Error;

/// Broker acknowledgment of a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// Topic the payload was routed to
    pub topic: String,
    /// Size of the published payload in bytes
    pub body_length: usize,
}

/// Reasons a publish could not be acknowledged.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to message broker: {0}")]
    Connection(String),

    #[error("failed to declare topic {topic}: {reason}")]
    Declare { topic: String, reason: String },

    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("broker rejected publish to {0}")]
    Nacked(String),
}
