//! RabbitMQ consumer module using lapin.
//!
//! Explicit subscribe-and-dispatch loop: declare the exchange and the
//! configured queue, bind them with the fixed routing key, then consume
//! until shutdown. One task is spawned per delivery; concurrency across
//! deliveries is bounded by the channel prefetch.
//!
//! Acknowledgment policy: manual acks. A persisted record is acked, a
//! failed insert is nacked with requeue, and a payload that fails
//! deserialization is nacked without requeue.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Connection, ConnectionProperties, ExchangeKind,
};
use tokio::signal;
use tracing::{error, info, warn};

use userrelay::{Config, UserRecord, UserStore, USER_EXCHANGE, USER_ROUTING_KEY};

/// Run the RabbitMQ consumer.
///
/// This function:
/// 1. Connects to RabbitMQ using the configured URL
/// 2. Sets up QoS with the configured prefetch
/// 3. Declares the exchange and queue, and binds them (idempotent operations)
/// 4. Starts consuming messages, spawning a task for each
/// 5. Handles graceful shutdown on SIGINT/SIGTERM
pub async fn run(config: Config, store: UserStore) -> Result<()> {
    let queue = config.queue.clone().context("USER_QUEUE must be set")?;

    // Connect to RabbitMQ
    info!(url_length = config.amqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.amqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    // Create a channel
    let channel = conn
        .create_channel()
        .await
        .context("Failed to create channel")?;

    info!("rabbitmq_channel_created");

    // Set QoS to bound concurrent in-flight deliveries
    channel
        .basic_qos(config.consumer_prefetch, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = config.consumer_prefetch, "rabbitmq_qos_set");

    // Declare the exchange (idempotent, matches the publisher side)
    channel
        .exchange_declare(
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

    // Declare the configured queue and bind it with the fixed routing key
    channel
        .queue_declare(
            &queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare queue")?;

    channel
        .queue_bind(
            &queue,
            USER_EXCHANGE,
            USER_ROUTING_KEY,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to bind queue")?;

    info!(
        exchange = USER_EXCHANGE,
        routing_key = USER_ROUTING_KEY,
        queue = %queue,
        "rabbitmq_queue_bound"
    );

    // Start consuming messages
    let mut consumer = channel
        .basic_consume(
            &queue,
            "userrelay-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = %queue, "rabbitmq_consumer_started");
    info!("consumer_ready");

    // Clone channel for use in message handler
    let channel = Arc::new(channel);

    // Create shutdown signal future
    let shutdown = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }
    };

    // Pin the shutdown future
    tokio::pin!(shutdown);

    // Process messages until shutdown
    loop {
        tokio::select! {
            // Check for shutdown signal
            _ = &mut shutdown => {
                info!("consumer_stopping");
                break;
            }
            // Process next message
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let delivery_tag = delivery.delivery_tag;
                        let message_id = delivery
                            .properties
                            .message_id()
                            .as_ref()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string());

                        info!(
                            queue = %queue,
                            message_id = %message_id,
                            delivery_tag = delivery_tag,
                            body_length = delivery.data.len(),
                            "rabbitmq_message_received"
                        );

                        // Clone resources for the spawned task
                        let store = store.clone();
                        let channel = Arc::clone(&channel);

                        // Spawn a task to handle this message
                        tokio::spawn(async move {
                            // Parse the user record JSON
                            let record: Result<UserRecord, _> =
                                serde_json::from_slice(&delivery.data);

                            match record {
                                Ok(record) => {
                                    match store.insert(&record).await {
                                        Ok(stored) => {
                                            // Acknowledge the message
                                            if let Err(e) = channel
                                                .basic_ack(delivery_tag, BasicAckOptions::default())
                                                .await
                                            {
                                                error!(
                                                    delivery_tag = delivery_tag,
                                                    error = %e,
                                                    "rabbitmq_ack_failed"
                                                );
                                            } else {
                                                info!(
                                                    id = stored.id,
                                                    user_id = %stored.user_id,
                                                    message_id = %message_id,
                                                    "user_persisted"
                                                );
                                            }
                                        }
                                        Err(e) => {
                                            error!(
                                                user_id = %record.user_id,
                                                message_id = %message_id,
                                                error = %e,
                                                "user_persist_failed"
                                            );

                                            // Requeue: the store may be transiently unavailable
                                            if let Err(nack_err) = channel
                                                .basic_nack(
                                                    delivery_tag,
                                                    BasicNackOptions {
                                                        requeue: true,
                                                        ..Default::default()
                                                    },
                                                )
                                                .await
                                            {
                                                error!(
                                                    delivery_tag = delivery_tag,
                                                    error = %nack_err,
                                                    "rabbitmq_nack_failed"
                                                );
                                            }
                                        }
                                    }
                                }
                                Err(e) => {
                                    error!(
                                        message_id = %message_id,
                                        error = %e,
                                        body_preview = %String::from_utf8_lossy(
                                            &delivery.data[..delivery.data.len().min(500)]
                                        ),
                                        "user_parse_failed"
                                    );

                                    // Don't requeue: a malformed payload can never succeed
                                    let _ = channel
                                        .basic_nack(
                                            delivery_tag,
                                            BasicNackOptions {
                                                requeue: false,
                                                ..Default::default()
                                            },
                                        )
                                        .await;
                                }
                            }
                        });
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    info!("consumer_shutdown_complete");
    Ok(())
}
