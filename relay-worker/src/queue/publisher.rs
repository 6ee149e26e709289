//! Async RabbitMQ publisher for user records.
//!
//! This module provides a connection-pooled publisher that can be shared
//! across multiple async tasks, publishing to the fixed user exchange with
//! the fixed routing key.

use std::sync::Arc;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{UserRecord, USER_EXCHANGE, USER_ROUTING_KEY};

/// Async RabbitMQ publisher with connection management.
///
/// The publisher maintains a persistent connection and channel to RabbitMQ,
/// automatically reconnecting on failure.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a new publisher with the given RabbitMQ URL.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel> {
        // Check if we have a valid channel
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        // Need to reconnect
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        // Create new connection
        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        // Create new channel
        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        // Declare the user exchange (idempotent operation)
        ch.exchange_declare(
            USER_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare user exchange")?;

        info!(exchange = USER_EXCHANGE, "rabbitmq_exchange_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish a user record to the user exchange.
    ///
    /// Fire-and-forget beyond the broker confirm: there is no retry and no
    /// correlation with the consumer-side persist outcome.
    pub async fn publish(&self, record: &UserRecord) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(record).context("Failed to serialize user record")?;

        // Generate a message ID for tracking
        let message_id = format!("user-{}", record.user_id);

        channel
            .basic_publish(
                USER_EXCHANGE,
                USER_ROUTING_KEY,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(message_id.clone().into()),
            )
            .await
            .context("Failed to publish to user exchange")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            exchange = USER_EXCHANGE,
            routing_key = USER_ROUTING_KEY,
            message_id = %message_id,
            body_length = body.len(),
            "rabbitmq_user_published"
        );

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_creation() {
        let publisher = Publisher::new("amqp://localhost:5672".to_string());
        // Just verify it can be created
        assert!(Arc::strong_count(&publisher.inner) == 1);
    }
}
