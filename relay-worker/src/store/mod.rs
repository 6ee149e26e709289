//! Store module for relational persistence.
//!
//! Explicit data-access layer over the `users` table. The connection pool
//! is built from a database URL passed at startup and handed to whoever
//! needs it, rather than injected by a framework container.

pub mod users;

pub use users::{StoreError, StoredUser, UserStore};
