//! Character persistence
//!
//! The sheet engine never touches storage. The service loads a character,
//! runs an engine operation and saves the result through a `CharacterStore`.

mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::character::Character;

pub use memory::MemoryCharacterStore;
pub use sqlite::SqliteCharacterStore;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt character state: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed character storage
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Load a character by name
    async fn load(&self, name: &str) -> Result<Option<Character>, StoreError>;

    /// Insert or replace a character
    async fn save(&self, name: &str, character: &Character) -> Result<(), StoreError>;

    /// All stored character names, sorted
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a character, returning whether it existed
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}
