//! Web server module for accepting user records.
//!
//! This module provides a thin, fast web server that:
//! - Receives a user record over HTTP
//! - Immediately publishes it to the user exchange
//! - Returns 202 Accepted
//!
//! Persistence happens in the consumer process; there is no feedback path
//! from the consumer back to this endpoint.

pub mod handlers;

pub use handlers::{health, publish_user, AppState, HealthResponse, PublishResponse};
