//! In-process character store

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CharacterStore, StoreError};
use crate::character::Character;

/// Characters held in memory; lost on restart
#[derive(Debug, Default)]
pub struct MemoryCharacterStore {
    characters: RwLock<BTreeMap<String, Character>>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CharacterStore for MemoryCharacterStore {
    async fn load(&self, name: &str) -> Result<Option<Character>, StoreError> {
        Ok(self.characters.read().await.get(name).cloned())
    }

    async fn save(&self, name: &str, character: &Character) -> Result<(), StoreError> {
        self.characters
            .write()
            .await
            .insert(name.to_string(), character.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.characters.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.characters.write().await.remove(name).is_some())
    }
}
