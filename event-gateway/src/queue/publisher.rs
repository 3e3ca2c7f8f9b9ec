//! Async publishers for verified events.
//!
//! `AmqpPublisher` maintains one connection and channel to RabbitMQ shared
//! across request tasks, reconnecting on failure. Each topic maps to a durable
//! queue of the same name, declared the first time it is published to.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::types::{PublishAck, PublishError};

/// Sink for verified event payloads.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` to `topic` and wait for the broker's acknowledgment.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishAck, PublishError>;
}

/// RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct AmqpPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
    declared: Mutex<HashSet<String>>,
}

impl AmqpPublisher {
    /// Create a new publisher with the given RabbitMQ URL.
    ///
    /// No connection is made until the first publish.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
                declared: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel, PublishError> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        let ch = conn
            .create_channel()
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        // Publisher confirms make every basic_publish resolve to an ack or nack.
        ch.confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        info!("rabbitmq_publisher_connected");

        // Queues declared on the old channel must be re-declared.
        self.inner.declared.lock().await.clear();

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Declare the durable queue backing `topic` once per connection.
    async fn ensure_declared(&self, channel: &Channel, topic: &str) -> Result<(), PublishError> {
        let mut declared = self.inner.declared.lock().await;
        if declared.contains(topic) {
            return Ok(());
        }

        channel
            .queue_declare(
                topic,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| PublishError::Declare {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        info!(queue = topic, "rabbitmq_queue_declared");
        declared.insert(topic.to_string());
        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishAck, PublishError> {
        let channel = self.ensure_connected().await?;
        self.ensure_declared(&channel, topic).await?;

        let publish_failed = |e: lapin::Error| PublishError::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        };

        let confirmation = channel
            .basic_publish(
                "",
                topic,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("text/plain".into()),
            )
            .await
            .map_err(publish_failed)?
            .await
            .map_err(publish_failed)?;

        if confirmation.is_nack() {
            warn!(queue = topic, "rabbitmq_publish_nacked");
            return Err(PublishError::Nacked(topic.to_string()));
        }

        info!(
            queue = topic,
            body_length = payload.len(),
            "rabbitmq_event_published"
        );

        Ok(PublishAck {
            topic: topic.to_string(),
            body_length: payload.len(),
        })
    }
}
