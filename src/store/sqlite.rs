//! SQLite-backed character store
//!
//! Each character is one row: the name as key and the full sheet as JSON.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::{CharacterStore, StoreError};
use crate::character::Character;

/// Character storage in the `characters` table
#[derive(Debug, Clone)]
pub struct SqliteCharacterStore {
    pool: SqlitePool,
}

impl SqliteCharacterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CharacterStore for SqliteCharacterStore {
    async fn load(&self, name: &str) -> Result<Option<Character>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT state FROM characters WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((state,)) => Ok(Some(serde_json::from_str(&state)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, name: &str, character: &Character) -> Result<(), StoreError> {
        let state = serde_json::to_string(character)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO characters (name, state, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(&state)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!("Saved character {} ({} bytes)", name, state.len());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM characters ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM characters WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
