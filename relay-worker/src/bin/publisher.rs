//! UserRelay Publisher - web server that enqueues user records.
//!
//! This binary provides a thin, fast web server that:
//! - Accepts a user record via POST /users
//! - Immediately publishes it to the user exchange with the fixed routing key
//! - Returns 202 Accepted
//!
//! Persistence happens in the consumer process.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use userrelay::web::{health, publish_user, AppState};
use userrelay::{Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("publisher_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        amqp_url_set = !config.amqp_url.is_empty(),
        "config_loaded"
    );

    // Create RabbitMQ publisher
    let publisher = Publisher::new(config.amqp_url.clone());
    info!("rabbitmq_publisher_created");

    // Create application state
    let state = AppState::new(publisher.clone());

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/users", post(publish_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "publisher_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Close publisher connection
    publisher.close().await;

    info!("publisher_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
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

    info!("publisher_shutting_down");
}
