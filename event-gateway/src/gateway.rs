//! Event gateway: verify, then publish or alert.
//!
//! Every request ends in exactly one side effect:
//!
//! ```text
//! Valid   → EventPublisher::publish(topic, canonical bytes) → Accepted(record)
//! Invalid → Notifier::notify(channel, diagnostic)           → Rejected
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::notify::Notifier;
use crate::queue::{EventPublisher, PublishError};
use crate::signature::{canonicalize, verify, EventRecord, SharedSecret, Verification};

/// Longest caller-supplied value copied into an alert, in bytes.
pub const MAX_ALERT_FIELD_BYTES: usize = 256;

/// Reason given for every signature rejection.
pub const INVALID_SIGNATURE: &str = "invalid signature";

/// Optional caller identity sent alongside an event.
///
/// Not covered by the signature; used only in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub app_id: Option<String>,
    pub account_id: Option<i64>,
    pub session_id: Option<i64>,
}

/// Terminal state of a handled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Signature verified and event published; carries the echoed record.
    Accepted(EventRecord),
    /// Signature did not verify; an alert was attempted.
    Rejected { reason: &'static str },
}

/// Failures after a request was accepted for processing.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("publisher unavailable: {0}")]
    PublisherUnavailable(#[from] PublishError),
}

/// Gateway settings fixed at startup.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub secret: SharedSecret,
    pub topic: String,
    pub alert_channel: String,
}

/// Request orchestrator shared by all handler tasks.
#[derive(Clone)]
pub struct EventGateway {
    settings: Arc<GatewaySettings>,
    publisher: Arc<dyn EventPublisher>,
    notifier: Arc<dyn Notifier>,
}

impl EventGateway {
    pub fn new(
        settings: GatewaySettings,
        publisher: Arc<dyn EventPublisher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            publisher,
            notifier,
        }
    }

    /// Handle one signed event.
    pub async fn handle(
        &self,
        server_event: &str,
        event: EventRecord,
        signature: &str,
        identity: &Identity,
    ) -> Result<Outcome, GatewayError> {
        match verify(&event, signature, &self.settings.secret) {
            Verification::Valid => {
                let payload = canonicalize(&event);
                let ack = self
                    .publisher
                    .publish(&self.settings.topic, &payload)
                    .await
                    .map_err(|e| {
                        error!(server_event = %server_event, error = %e, "event_publish_failed");
                        GatewayError::from(e)
                    })?;

                info!(
                    server_event = %server_event,
                    event = %event.event,
                    character_id = %event.character_id,
                    topic = %ack.topic,
                    body_length = ack.body_length,
                    "event_accepted"
                );

                Ok(Outcome::Accepted(event))
            }
            Verification::Invalid => {
                warn!(
                    server_event = %server_event,
                    app_id = ?identity.app_id,
                    account_id = ?identity.account_id,
                    session_id = ?identity.session_id,
                    "event_signature_invalid"
                );

                let text = diagnostic(server_event, identity, signature, &event);
                if let Err(e) = self
                    .notifier
                    .notify(&self.settings.alert_channel, &text)
                    .await
                {
                    warn!(server_event = %server_event, error = %e, "forgery_alert_failed");
                }

                Ok(Outcome::Rejected {
                    reason: INVALID_SIGNATURE,
                })
            }
        }
    }
}

/// Alert text for a rejected event.
///
/// Caller-supplied values are truncated and have Slack control characters
/// escaped, so a forged request cannot inject mentions or links.
pub fn diagnostic(
    server_event: &str,
    identity: &Identity,
    signature: &str,
    event: &EventRecord,
) -> String {
    let app_id = identity.app_id.as_deref().map_or_else(|| "-".to_string(), alert_field);
    let or_dash = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |n| n.to_string());

    format!(
        "Invalid signature! server_event={} app_id={} account_id={} session_id={} signature={} event={}",
        alert_field(server_event),
        app_id,
        or_dash(identity.account_id),
        or_dash(identity.session_id),
        alert_field(signature),
        alert_field(&String::from_utf8_lossy(&canonicalize(event))),
    )
}

/// Truncate to `MAX_ALERT_FIELD_BYTES` on a char boundary and escape `&`, `<`, `>`.
fn alert_field(value: &str) -> String {
    let mut end = value.len().min(MAX_ALERT_FIELD_BYTES);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = end < value.len();

    let mut out = String::with_capacity(end + 3);
    for c in value[..end].chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    if truncated {
        out.push_str("...");
    }
    out
}
