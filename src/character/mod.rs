//! Character sheets
//!
//! - `types`: abilities, skills, races and the skill/ability table
//! - `sheet`: the character entity and its stat/skill derivation
//! - `service`: per-character serialized access over a `CharacterStore`

mod service;
mod sheet;
mod types;

use thiserror::Error;

use crate::dice::DiceError;

pub use service::{CharacterService, ServiceError};
pub use sheet::{derive_skills, Character, CharacterInit, DEFAULT_PROFICIENCY_BONUS};
pub use types::{
    ability_modifier, Ability, AbilityScore, AbilitySet, ProficiencySet, Race, Skill, SkillSet,
    SkillValue, SpecialAbilities, SpecialAbility,
};

/// Character sheet errors
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("missing ability score for {0}")]
    MissingAbilityData(Ability),

    #[error("could not roll stats: {0}")]
    RandomSource(#[from] DiceError),
}
