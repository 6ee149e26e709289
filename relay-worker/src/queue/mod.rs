//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The wire format of the user record
//! - Async publisher for sending records to the user exchange
//!
//! ## Architecture
//!
//! ```text
//! Web Server → user.exchange → bound queue → Consumer
//! ```

pub mod publisher;
pub mod types;

pub use publisher::Publisher;
pub use types::{UserRecord, USER_EXCHANGE, USER_ROUTING_KEY};
