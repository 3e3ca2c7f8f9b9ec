//! Event Gateway - signed event webhook receiver.
//!
//! This library backs two binaries:
//! - `eventgate-web`: HTTP receiver that verifies and forwards events
//! - `eventgate-sign`: signing helper for event producers and test clients
//!
//! ## Architecture
//!
//! ```text
//! POST /{server_event} → Gateway → verify ─┬─ Valid   → RabbitMQ topic
//!                                          └─ Invalid → Slack alert + 400
//! ```

pub mod config;
pub mod gateway;
pub mod notify;
pub mod queue;
pub mod signature;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use gateway::{EventGateway, GatewayError, GatewaySettings, Identity, Outcome};
pub use notify::{Notifier, NotifyError, SlackNotifier};
pub use queue::{AmqpPublisher, EventPublisher, PublishAck, PublishError};
pub use signature::{canonicalize, sign, verify, EventRecord, SharedSecret, Verification};
pub use web::AppState;
