//! UserRelay - one-way user record relay over RabbitMQ.
//!
//! This library provides shared modules for the two UserRelay binaries:
//! - `userrelay-publisher`: Thin web server that enqueues user records
//! - `userrelay-consumer`: Worker that persists received records
//!
//! ## Architecture
//!
//! ```text
//! POST /users → Publisher → user.exchange → bound queue → Consumer → users table
//! ```

pub mod config;
pub mod queue;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use queue::{Publisher, UserRecord, USER_EXCHANGE, USER_ROUTING_KEY};
pub use store::{StoreError, StoredUser, UserStore};
pub use web::AppState;
