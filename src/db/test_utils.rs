//! Database helpers for unit tests

use sqlx::SqlitePool;

use super::Database;

/// Fresh in-memory pool with the production schema applied
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}
