//! Character sheet engine
//!
//! Owns one character's identity, ability scores and derived skills. All
//! operations are synchronous state transitions; storage and locking live
//! in the service layer around them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{
    Ability, AbilityScore, AbilitySet, ProficiencySet, Race, Skill, SkillSet, SkillValue,
    SpecialAbilities, SpecialAbility,
};
use super::CharacterError;
use crate::dice::{roll_drop_lowest, RandomSource};

/// Proficiency bonus used when none (or zero) is supplied
pub const DEFAULT_PROFICIENCY_BONUS: i32 = 2;

/// Data accepted by `Character::initialize`
///
/// Shares its field names with the serialized `Character`, so a snapshot can
/// be fed back in. Derived `skills` in the input are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInit {
    pub name: String,
    pub alignment: String,
    pub back_story: String,
    pub hit_points: i32,
    pub movement_speed: i32,
    #[serde(default)]
    pub abilities: SpecialAbilities,
    #[serde(default)]
    pub physical_description: Option<String>,
    #[serde(default)]
    pub race: Option<Race>,
    #[serde(default)]
    pub proficiency_bonus: Option<i32>,
    #[serde(default)]
    pub stats: AbilitySet,
    #[serde(default, alias = "proficiencies")]
    pub skill_proficiencies: Option<ProficiencySet>,
}

/// A character sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    pub alignment: String,
    pub back_story: String,
    pub physical_description: String,
    pub race: Race,
    pub hit_points: i32,
    pub movement_speed: i32,
    proficiency_bonus: i32,
    stats: AbilitySet,
    skills: SkillSet,
    abilities: SpecialAbilities,
    skill_proficiencies: Option<ProficiencySet>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name: String::new(),
            alignment: String::new(),
            back_story: String::new(),
            physical_description: String::new(),
            race: Race::default(),
            hit_points: 0,
            movement_speed: 0,
            proficiency_bonus: DEFAULT_PROFICIENCY_BONUS,
            stats: AbilitySet::new(),
            skills: SkillSet::new(),
            abilities: SpecialAbilities::new(),
            skill_proficiencies: None,
        }
    }
}

/// Recompute every skill from ability scores and proficiencies
///
/// Fails if a skill's driving ability has no score.
pub fn derive_skills(
    stats: &AbilitySet,
    proficiency_bonus: i32,
    proficiencies: Option<&ProficiencySet>,
) -> Result<SkillSet, CharacterError> {
    Skill::ALL
        .iter()
        .map(|&skill| {
            let ability = skill.ability();
            let score = stats
                .get(&ability)
                .ok_or(CharacterError::MissingAbilityData(ability))?;
            let proficient = proficiencies.is_some_and(|set| set.contains(&skill));
            let value = if proficient {
                score.bonus.saturating_add(proficiency_bonus)
            } else {
                score.bonus
            };
            Ok((
                skill,
                SkillValue {
                    driving_ability: ability,
                    proficient,
                    value,
                    passive_value: value.saturating_add(10),
                },
            ))
        })
        .collect()
}

impl Character {
    /// An empty sheet, as handed out before `initialize`
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the sheet from creation data
    ///
    /// Overwrites every field. Ability scores merge with any previous scores
    /// before skills are recomputed; an empty score set rolls fresh ones.
    /// On error the sheet is left untouched.
    pub fn initialize<S: RandomSource + ?Sized>(
        &mut self,
        init: CharacterInit,
        dice: &mut S,
    ) -> Result<(), CharacterError> {
        let mut next = self.clone();

        next.name = init.name;
        next.alignment = init.alignment;
        next.back_story = init.back_story;
        next.abilities = init.abilities;
        next.hit_points = init.hit_points;
        next.movement_speed = init.movement_speed;
        next.physical_description = init.physical_description.unwrap_or_default();

        // Zero counts as "not supplied"
        next.proficiency_bonus = match init.proficiency_bonus {
            Some(bonus) if bonus != 0 => bonus,
            Some(_) => {
                debug!(
                    "Proficiency bonus 0 for {} replaced with default {}",
                    next.name, DEFAULT_PROFICIENCY_BONUS
                );
                DEFAULT_PROFICIENCY_BONUS
            }
            None => DEFAULT_PROFICIENCY_BONUS,
        };

        let proficiencies = init.skill_proficiencies;
        if init.stats.is_empty() {
            next.randomize_stats(dice, proficiencies.as_ref())?;
        } else {
            next.update_stats_and_skills(&init.stats, proficiencies.as_ref())?;
        }

        next.race = init.race.unwrap_or_default();
        next.skill_proficiencies = proficiencies;

        *self = next;
        info!("Initialized character {}", self.name);
        Ok(())
    }

    /// Merge new scores into the sheet and recompute every skill
    ///
    /// Supplied bonuses are taken as given. Without `proficiencies` no skill
    /// is proficient.
    pub fn update_stats_and_skills(
        &mut self,
        new_stats: &AbilitySet,
        proficiencies: Option<&ProficiencySet>,
    ) -> Result<(), CharacterError> {
        let mut stats = self.stats.clone();
        stats.extend(new_stats.iter().map(|(ability, score)| (*ability, *score)));

        self.skills = derive_skills(&stats, self.proficiency_bonus, proficiencies)?;
        self.stats = stats;
        Ok(())
    }

    /// Roll 4d6-drop-lowest for every ability and recompute skills
    pub fn randomize_stats<S: RandomSource + ?Sized>(
        &mut self,
        dice: &mut S,
        proficiencies: Option<&ProficiencySet>,
    ) -> Result<(), CharacterError> {
        let mut rolled = AbilitySet::new();
        for ability in Ability::ALL {
            let raw = roll_drop_lowest(dice, 4, 6)? as i32;
            rolled.insert(ability, AbilityScore::from_raw(raw));
        }
        debug!("Rolled stats for {}: {:?}", self.name, rolled);
        self.update_stats_and_skills(&rolled, proficiencies)
    }

    /// Hit points may drop below zero
    pub fn take_damage(&mut self, amount: i32) {
        self.hit_points = self.hit_points.saturating_sub(amount);
    }

    /// No upper limit is enforced
    pub fn heal(&mut self, amount: i32) {
        self.hit_points = self.hit_points.saturating_add(amount);
    }

    /// Add or replace a special ability by name
    pub fn add_ability(&mut self, ability: SpecialAbility) {
        self.abilities.insert(ability.name.clone(), ability);
    }

    /// Remove a special ability; unknown names are ignored
    pub fn remove_ability(&mut self, name: &str) -> Option<SpecialAbility> {
        self.abilities.remove(name)
    }

    /// Set the proficiency bonus
    ///
    /// Skills keep their old values until the next
    /// `update_stats_and_skills` or `randomize_stats`.
    pub fn update_proficiency_bonus(&mut self, bonus: i32) {
        self.proficiency_bonus = bonus;
    }

    /// Movement is not tracked yet; only reports the intent
    pub fn move_by(&self, distance: i32) -> String {
        let message = format!(
            "{} moves {} units at a speed of {}.",
            self.name, distance, self.movement_speed
        );
        info!("{}", message);
        message
    }

    /// Prompt for the portrait generator
    pub fn portrait_prompt(&self) -> String {
        format!(
            "Dungeons and Dragons character named {}\nRace: {}\nPhysical description: {}\nAlignment: {}",
            self.name, self.race, self.physical_description, self.alignment
        )
    }

    /// Flat JSON snapshot of every field
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        self.proficiency_bonus
    }

    pub fn stats(&self) -> &AbilitySet {
        &self.stats
    }

    pub fn stat(&self, ability: Ability) -> Option<&AbilityScore> {
        self.stats.get(&ability)
    }

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    pub fn skill(&self, skill: Skill) -> Option<&SkillValue> {
        self.skills.get(&skill)
    }

    pub fn abilities(&self) -> &SpecialAbilities {
        &self.abilities
    }

    pub fn skill_proficiencies(&self) -> Option<&ProficiencySet> {
        self.skill_proficiencies.as_ref()
    }
}
