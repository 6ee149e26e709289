//! UserRelay Consumer - async RabbitMQ worker that persists user records.
//!
//! This worker consumes user records from the queue bound to the user
//! exchange and inserts each one as a new row in the relational store.

mod consumer;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use userrelay::{Config, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("consumer_starting");

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(
        amqp_url_set = !config.amqp_url.is_empty(),
        queue = ?config.queue,
        prefetch = config.consumer_prefetch,
        "config_loaded"
    );

    // Connect to the store and make sure the schema exists
    let store = UserStore::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    store
        .setup()
        .await
        .context("Failed to set up database schema")?;

    // Start the consumer
    consumer::run(config, store).await?;

    Ok(())
}
