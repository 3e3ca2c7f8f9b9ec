//! Queue module for forwarding verified events.
//!
//! This module provides:
//! - The `EventPublisher` seam the gateway publishes through
//! - A RabbitMQ implementation of it
//!
//! ## Architecture
//!
//! ```text
//! Web Server → Gateway → EventPublisher → <project>.<topic> queue → consumers
//! ```

pub mod publisher;
pub mod types;

pub use publisher::{AmqpPublisher, EventPublisher};
pub use types::{PublishAck, PublishError};
