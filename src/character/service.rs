//! Character service
//!
//! Loads a character, runs one sheet operation and saves the result. A
//! per-name async lock keeps mutations of the same character strictly
//! sequential; different characters proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use super::{
    AbilitySet, Character, CharacterError, CharacterInit, ProficiencySet, SpecialAbility,
};
use crate::dice::{DiceError, DiceRoll, RandomSource, RollOutcome};
use crate::store::{CharacterStore, StoreError};

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("character not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Character(#[from] CharacterError),

    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Serialized access to stored characters
pub struct CharacterService {
    store: Arc<dyn CharacterStore>,
    dice: Mutex<Box<dyn RandomSource>>,
    locks: LockMap,
}

/// Held while one character is being changed
struct NameLock<'a> {
    locks: &'a LockMap,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameLock<'_> {
    fn drop(&mut self) {
        // Lookups clone under the map mutex, so holding it here means nobody
        // can pick up this lock while the count is checked
        let mut locks = self.locks.lock();
        if let Some(guard) = self.guard.take() {
            let lock = Arc::clone(OwnedMutexGuard::mutex(&guard));
            drop(guard);
            // Only the map and `lock` remain
            if Arc::strong_count(&lock) == 2
                && locks.get(&self.name).is_some_and(|l| Arc::ptr_eq(l, &lock))
            {
                locks.remove(&self.name);
            }
        }
    }
}

impl CharacterService {
    pub fn new(store: Arc<dyn CharacterStore>, dice: Box<dyn RandomSource>) -> Self {
        Self {
            store,
            dice: Mutex::new(dice),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Take the per-name lock; the map entry goes away with its last holder
    async fn lock_name(&self, name: &str) -> NameLock<'_> {
        let lock = self
            .locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        NameLock {
            locks: &self.locks,
            name: name.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Run `op` on a stored character under its lock and save the result
    async fn mutate<T>(
        &self,
        name: &str,
        op: impl FnOnce(&mut Character, &mut dyn RandomSource) -> Result<T, CharacterError>,
    ) -> Result<T, ServiceError> {
        let _lock = self.lock_name(name).await;

        let mut character = self
            .store
            .load(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;

        let out = {
            let mut dice = self.dice.lock();
            op(&mut character, dice.as_mut())?
        };

        self.store.save(name, &character).await?;
        Ok(out)
    }

    /// Create or re-initialize a character, keyed by its name
    pub async fn create(&self, init: CharacterInit) -> Result<Character, ServiceError> {
        if init.name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Character name is required".to_string(),
            ));
        }

        let name = init.name.clone();
        let _lock = self.lock_name(&name).await;

        let mut character = self.store.load(&name).await?.unwrap_or_default();
        {
            let mut dice = self.dice.lock();
            character.initialize(init, dice.as_mut())?;
        }
        self.store.save(&name, &character).await?;

        info!("Character {} created", name);
        Ok(character)
    }

    /// Current sheet for a character
    pub async fn get(&self, name: &str) -> Result<Character, ServiceError> {
        self.store
            .load(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.list().await?)
    }

    pub async fn delete(&self, name: &str) -> Result<(), ServiceError> {
        let _lock = self.lock_name(name).await;

        if !self.store.delete(name).await? {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        info!("Character {} deleted", name);
        Ok(())
    }

    pub async fn damage(&self, name: &str, amount: i32) -> Result<Character, ServiceError> {
        debug!("{} takes {} damage", name, amount);
        self.mutate(name, |c, _| {
            c.take_damage(amount);
            Ok(c.clone())
        })
        .await
    }

    pub async fn heal(&self, name: &str, amount: i32) -> Result<Character, ServiceError> {
        debug!("{} heals {}", name, amount);
        self.mutate(name, |c, _| {
            c.heal(amount);
            Ok(c.clone())
        })
        .await
    }

    pub async fn add_ability(
        &self,
        name: &str,
        ability: SpecialAbility,
    ) -> Result<Character, ServiceError> {
        if ability.name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Ability name is required".to_string(),
            ));
        }
        self.mutate(name, |c, _| {
            c.add_ability(ability);
            Ok(c.clone())
        })
        .await
    }

    pub async fn remove_ability(
        &self,
        name: &str,
        ability: &str,
    ) -> Result<Character, ServiceError> {
        self.mutate(name, |c, _| {
            c.remove_ability(ability);
            Ok(c.clone())
        })
        .await
    }

    /// Skills are not recomputed; see `Character::update_proficiency_bonus`
    pub async fn update_proficiency_bonus(
        &self,
        name: &str,
        bonus: i32,
    ) -> Result<Character, ServiceError> {
        self.mutate(name, |c, _| {
            c.update_proficiency_bonus(bonus);
            Ok(c.clone())
        })
        .await
    }

    /// Merge scores and recompute skills
    ///
    /// Without explicit proficiencies the set recorded at initialization is used.
    pub async fn update_stats(
        &self,
        name: &str,
        stats: AbilitySet,
        proficiencies: Option<ProficiencySet>,
    ) -> Result<Character, ServiceError> {
        self.mutate(name, |c, _| {
            let proficiencies = proficiencies.or_else(|| c.skill_proficiencies().cloned());
            c.update_stats_and_skills(&stats, proficiencies.as_ref())?;
            Ok(c.clone())
        })
        .await
    }

    /// Reroll every ability score
    ///
    /// Without explicit proficiencies the set recorded at initialization is used.
    pub async fn randomize_stats(
        &self,
        name: &str,
        proficiencies: Option<ProficiencySet>,
    ) -> Result<Character, ServiceError> {
        self.mutate(name, |c, dice| {
            let proficiencies = proficiencies.or_else(|| c.skill_proficiencies().cloned());
            c.randomize_stats(dice, proficiencies.as_ref())?;
            Ok(c.clone())
        })
        .await
    }

    pub async fn move_by(&self, name: &str, distance: i32) -> Result<String, ServiceError> {
        Ok(self.get(name).await?.move_by(distance))
    }

    pub async fn portrait_prompt(&self, name: &str) -> Result<String, ServiceError> {
        Ok(self.get(name).await?.portrait_prompt())
    }

    /// Roll free-form dice with the service's random source
    pub fn roll(&self, roll: &DiceRoll) -> Result<RollOutcome, ServiceError> {
        let mut dice = self.dice.lock();
        Ok(roll.roll(dice.as_mut())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Ability, AbilityScore, Skill};
    use crate::dice::{ScriptedSource, SeededSource};
    use crate::store::MemoryCharacterStore;

    fn service() -> CharacterService {
        CharacterService::new(
            Arc::new(MemoryCharacterStore::new()),
            Box::new(SeededSource::new(7)),
        )
    }

    fn kaelin() -> CharacterInit {
        CharacterInit {
            name: "Kaelin".to_string(),
            alignment: "Lawful Good".to_string(),
            back_story: "Ranger of the north".to_string(),
            hit_points: 12,
            movement_speed: 30,
            proficiency_bonus: Some(2),
            skill_proficiencies: Some([Skill::Stealth].into_iter().collect()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = service();
        let created = service.create(kaelin()).await.unwrap();
        assert_eq!(created.stats().len(), 6);

        let loaded = service.get("Kaelin").await.unwrap();
        assert_eq!(loaded, created);

        let stealth = loaded.skill(Skill::Stealth).unwrap();
        let dex = loaded.stat(Ability::Dexterity).unwrap();
        assert!(stealth.proficient);
        assert_eq!(stealth.value, dex.bonus + 2);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let service = service();
        let result = service.create(CharacterInit::default()).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_character() {
        let service = service();
        assert!(matches!(
            service.get("Nobody").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.damage("Nobody", 3).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete("Nobody").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_damage_and_heal_persist() {
        let service = service();
        service.create(kaelin()).await.unwrap();

        service.damage("Kaelin", 15).await.unwrap();
        assert_eq!(service.get("Kaelin").await.unwrap().hit_points, -3);

        service.heal("Kaelin", 5).await.unwrap();
        assert_eq!(service.get("Kaelin").await.unwrap().hit_points, 2);
    }

    #[tokio::test]
    async fn test_recreate_merges_scores() {
        let service = service();
        let first = service.create(kaelin()).await.unwrap();

        let mut again = kaelin();
        again.stats = AbilitySet::from([(Ability::Strength, AbilityScore::from_raw(3))]);
        let second = service.create(again).await.unwrap();

        assert_eq!(second.stat(Ability::Strength).unwrap().bonus, -4);
        assert_eq!(
            second.stat(Ability::Wisdom),
            first.stat(Ability::Wisdom)
        );
    }

    #[tokio::test]
    async fn test_abilities_round_trip() {
        let service = service();
        service.create(kaelin()).await.unwrap();

        let fireball = SpecialAbility {
            name: "Fireball".to_string(),
            description: "Throws a fireball".to_string(),
            uses_left: 3,
            effect: "Burns enemy".to_string(),
        };
        let c = service.add_ability("Kaelin", fireball).await.unwrap();
        assert!(c.abilities().contains_key("Fireball"));

        let c = service.remove_ability("Kaelin", "Fireball").await.unwrap();
        assert!(!c.abilities().contains_key("Fireball"));
        service.remove_ability("Kaelin", "Fireball").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_stats_keeps_recorded_proficiencies() {
        let service = service();
        service.create(kaelin()).await.unwrap();

        let c = service
            .update_stats(
                "Kaelin",
                AbilitySet::from([(Ability::Dexterity, AbilityScore::from_raw(18))]),
                None,
            )
            .await
            .unwrap();
        let stealth = c.skill(Skill::Stealth).unwrap();
        assert!(stealth.proficient);
        assert_eq!(stealth.value, 6);

        let c = service
            .update_stats("Kaelin", AbilitySet::new(), Some(ProficiencySet::new()))
            .await
            .unwrap();
        assert_eq!(c.skill(Skill::Stealth).unwrap().value, 4);
    }

    #[tokio::test]
    async fn test_proficiency_bonus_then_recompute() {
        let service = service();
        service.create(kaelin()).await.unwrap();
        let before = service.get("Kaelin").await.unwrap();
        let dex_bonus = before.stat(Ability::Dexterity).unwrap().bonus;

        let c = service.update_proficiency_bonus("Kaelin", 4).await.unwrap();
        assert_eq!(c.proficiency_bonus(), 4);
        assert_eq!(c.skill(Skill::Stealth), before.skill(Skill::Stealth));

        let c = service
            .update_stats("Kaelin", AbilitySet::new(), None)
            .await
            .unwrap();
        assert_eq!(c.skill(Skill::Stealth).unwrap().value, dex_bonus + 4);
    }

    #[tokio::test]
    async fn test_randomize_with_failing_source_leaves_state() {
        let service = CharacterService::new(
            Arc::new(MemoryCharacterStore::new()),
            Box::new(ScriptedSource::new(vec![6; 24])),
        );
        let created = service.create(kaelin()).await.unwrap();
        assert_eq!(created.stat(Ability::Charisma).unwrap().raw, 18);

        let result = service.randomize_stats("Kaelin", None).await;
        assert!(matches!(
            result,
            Err(ServiceError::Character(CharacterError::RandomSource(_)))
        ));
        assert_eq!(service.get("Kaelin").await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_concurrent_damage_serialized() {
        let service = Arc::new(service());
        let mut init = kaelin();
        init.hit_points = 100;
        service.create(init).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.damage("Kaelin", 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(service.get("Kaelin").await.unwrap().hit_points, 80);
    }

    #[tokio::test]
    async fn test_lock_entries_released() {
        let service = Arc::new(service());
        for i in 0..1000 {
            assert!(matches!(
                service.damage(&format!("ghost{}", i), 1).await,
                Err(ServiceError::NotFound(_))
            ));
        }
        assert!(service.locks.lock().is_empty());

        service.create(kaelin()).await.unwrap();
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.heal("Kaelin", 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        service.delete("Kaelin").await.unwrap();

        assert!(service.locks.lock().is_empty());
        assert_eq!(service.list().await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_move_and_prompt() {
        let service = service();
        service.create(kaelin()).await.unwrap();
        assert_eq!(
            service.move_by("Kaelin", 10).await.unwrap(),
            "Kaelin moves 10 units at a speed of 30."
        );
        let prompt = service.portrait_prompt("Kaelin").await.unwrap();
        assert!(prompt.contains("Race: Human"));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let service = service();
        service.create(kaelin()).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec!["Kaelin"]);

        service.delete("Kaelin").await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_roll_notation() {
        let service = CharacterService::new(
            Arc::new(MemoryCharacterStore::new()),
            Box::new(ScriptedSource::new([3, 4])),
        );
        let roll: DiceRoll = "2d6+1".parse().unwrap();
        let outcome = service.roll(&roll).unwrap();
        assert_eq!(outcome.total, 8);
    }
}
