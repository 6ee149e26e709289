//! SQLite-backed user store.
//!
//! Every received record becomes a new row. There is no uniqueness on
//! `user_id` and no upsert: redelivering the same record produces a second
//! row with a distinct generated id.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

use crate::queue::UserRecord;

/// Row persisted in the `users` table.
///
/// `id` is the store-assigned surrogate key, distinct from the
/// externally supplied `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
}

/// Errors surfaced by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// SQLite-backed store for user rows.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Connect to the database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        info!("store_connected");

        Ok(Self { pool })
    }

    /// Single-connection in-memory store with the schema applied.
    ///
    /// In-memory SQLite databases are per-connection, so the pool is capped
    /// at one connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.setup().await?;

        Ok(store)
    }

    /// Create the `users` table if it does not exist.
    pub async fn setup(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("store_schema_ready");

        Ok(())
    }

    /// Insert a user record as a new row, returning the persisted row.
    pub async fn insert(&self, record: &UserRecord) -> Result<StoredUser, StoreError> {
        let result = sqlx::query("INSERT INTO users ( user_id, user_name ) VALUES ( ?1, ?2 )")
            .bind(&record.user_id)
            .bind(&record.user_name)
            .execute(&self.pool)
            .await?;

        Ok(StoredUser {
            id: result.last_insert_rowid(),
            user_id: record.user_id.clone(),
            user_name: record.user_name.clone(),
        })
    }

    /// Fetch a row by its generated id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<StoredUser>, StoreError> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, user_id, user_name FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, user_id, user_name)| StoredUser {
            id,
            user_id,
            user_name,
        }))
    }

    /// All rows in insertion order.
    pub async fn list(&self) -> Result<Vec<StoredUser>, StoreError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, user_id, user_name FROM users ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, user_name)| StoredUser {
                id,
                user_id,
                user_name,
            })
            .collect())
    }

    /// Delete a row by its generated id, returning whether a row existed.
    ///
    /// Not exercised by the relay path; part of the explicit CRUD surface.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_returns_generated_id() {
        let store = UserStore::in_memory().await.unwrap();

        let record = UserRecord::new("42".to_string(), "Bob".to_string());
        let stored = store.insert(&record).await.unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.user_id, "42");
        assert_eq!(stored.user_name, "Bob");
    }

    #[tokio::test]
    async fn test_redelivery_produces_duplicate_rows() {
        let store = UserStore::in_memory().await.unwrap();

        let record = UserRecord::new("u1".to_string(), "Alice".to_string());
        let first = store.insert(&record).await.unwrap();
        let second = store.insert(&record).await.unwrap();

        // No deduplication: same payload, two rows, distinct ids
        assert_ne!(first.id, second.id);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.user_name, second.user_name);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_user_name_persisted_as_empty_string() {
        let store = UserStore::in_memory().await.unwrap();

        let record = UserRecord::new("u2".to_string(), String::new());
        let stored = store.insert(&record).await.unwrap();

        let fetched = store.find_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_name, "");
    }

    #[tokio::test]
    async fn test_find_by_id_miss() {
        let store = UserStore::in_memory().await.unwrap();

        assert!(store.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_returns_insertion_order() {
        let store = UserStore::in_memory().await.unwrap();

        for name in ["first", "second", "third"] {
            let record = UserRecord::new(name.to_string(), name.to_string());
            store.insert(&record).await.unwrap();
        }

        let rows = store.list().await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let store = UserStore::in_memory().await.unwrap();

        let record = UserRecord::new("u3".to_string(), "Carol".to_string());
        let stored = store.insert(&record).await.unwrap();

        assert!(store.delete_by_id(stored.id).await.unwrap());
        assert!(!store.delete_by_id(stored.id).await.unwrap());
        assert!(store.find_by_id(stored.id).await.unwrap().is_none());
    }
}
