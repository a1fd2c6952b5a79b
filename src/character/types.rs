//! Character sheet vocabulary: abilities, skills, races and special abilities

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// The six ability scores, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    #[serde(rename = "STR", alias = "str")]
    Strength,
    #[serde(rename = "DEX", alias = "dex")]
    Dexterity,
    #[serde(rename = "CON", alias = "con")]
    Constitution,
    #[serde(rename = "INT", alias = "int")]
    Intelligence,
    #[serde(rename = "WIS", alias = "wis")]
    Wisdom,
    #[serde(rename = "CHA", alias = "cha")]
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Modifier for a raw ability score: floor((raw - 10) / 2)
///
/// Rounds toward negative infinity, so 3 gives -4 and 9 gives -1.
pub fn ability_modifier(raw: i32) -> i32 {
    // i64 keeps extreme inputs from overflowing; the result always fits i32
    (i64::from(raw) - 10).div_euclid(2) as i32
}

/// A single ability score and its modifier
///
/// Incoming JSON may omit `bonus`, in which case it is derived from `raw`.
/// A supplied `bonus` is kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AbilityScoreInput")]
pub struct AbilityScore {
    pub raw: i32,
    pub bonus: i32,
}

impl AbilityScore {
    pub fn from_raw(raw: i32) -> Self {
        Self {
            raw,
            bonus: ability_modifier(raw),
        }
    }
}

#[derive(Deserialize)]
struct AbilityScoreInput {
    raw: i32,
    #[serde(default)]
    bonus: Option<i32>,
}

impl From<AbilityScoreInput> for AbilityScore {
    fn from(input: AbilityScoreInput) -> Self {
        Self {
            raw: input.raw,
            bonus: input.bonus.unwrap_or_else(|| ability_modifier(input.raw)),
        }
    }
}

/// Ability scores keyed by ability
pub type AbilitySet = BTreeMap<Ability, AbilityScore>;

/// The eighteen skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Skill {
    Acrobatics,
    AnimalHandling,
    Arcana,
    Athletics,
    Deception,
    History,
    Insight,
    Intimidation,
    Investigation,
    Medicine,
    Nature,
    Perception,
    Performance,
    Persuasion,
    Religion,
    SleightOfHand,
    Stealth,
    Survival,
}

impl Skill {
    pub const ALL: [Skill; 18] = [
        Skill::Acrobatics,
        Skill::AnimalHandling,
        Skill::Arcana,
        Skill::Athletics,
        Skill::Deception,
        Skill::History,
        Skill::Insight,
        Skill::Intimidation,
        Skill::Investigation,
        Skill::Medicine,
        Skill::Nature,
        Skill::Perception,
        Skill::Performance,
        Skill::Persuasion,
        Skill::Religion,
        Skill::SleightOfHand,
        Skill::Stealth,
        Skill::Survival,
    ];

    /// The ability that drives this skill
    pub const fn ability(self) -> Ability {
        match self {
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::Athletics => Ability::Strength,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Skill::Acrobatics => "Acrobatics",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Arcana => "Arcana",
            Skill::Athletics => "Athletics",
            Skill::Deception => "Deception",
            Skill::History => "History",
            Skill::Insight => "Insight",
            Skill::Intimidation => "Intimidation",
            Skill::Investigation => "Investigation",
            Skill::Medicine => "Medicine",
            Skill::Nature => "Nature",
            Skill::Perception => "Perception",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
            Skill::Religion => "Religion",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Survival => "Survival",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A derived skill entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillValue {
    #[serde(rename = "drivingStat")]
    pub driving_ability: Ability,
    pub proficient: bool,
    pub value: i32,
    pub passive_value: i32,
}

/// Derived skills keyed by skill
pub type SkillSet = BTreeMap<Skill, SkillValue>;

/// Skills a character is proficient in
pub type ProficiencySet = BTreeSet<Skill>;

/// Playable races
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Race {
    Dragonborn,
    Dwarf,
    Elf,
    Gnome,
    #[serde(rename = "Half-Elf")]
    HalfElf,
    Halfling,
    #[serde(rename = "Half-Orc")]
    HalfOrc,
    #[default]
    Human,
    Tiefling,
    Aarakocra,
    Genasi,
    Goliath,
    Aasimar,
    Firbolg,
    Kenku,
    Lizardfolk,
    Tabaxi,
    Triton,
    Bugbear,
    Goblin,
    Hobgoblin,
    Kobold,
    Orc,
    #[serde(rename = "Yuan-ti Pureblood")]
    YuanTiPureblood,
    Tortle,
    Gith,
    Changeling,
    Kalashtar,
    Shifter,
    Warforged,
    Centaur,
    Loxodon,
    Minotaur,
    #[serde(rename = "Simic Hybrid")]
    SimicHybrid,
    Vedalken,
    Verdan,
    Locathah,
    Grung,
}

impl Race {
    pub fn as_str(self) -> &'static str {
        match self {
            Race::Dragonborn => "Dragonborn",
            Race::Dwarf => "Dwarf",
            Race::Elf => "Elf",
            Race::Gnome => "Gnome",
            Race::HalfElf => "Half-Elf",
            Race::Halfling => "Halfling",
            Race::HalfOrc => "Half-Orc",
            Race::Human => "Human",
            Race::Tiefling => "Tiefling",
            Race::Aarakocra => "Aarakocra",
            Race::Genasi => "Genasi",
            Race::Goliath => "Goliath",
            Race::Aasimar => "Aasimar",
            Race::Firbolg => "Firbolg",
            Race::Kenku => "Kenku",
            Race::Lizardfolk => "Lizardfolk",
            Race::Tabaxi => "Tabaxi",
            Race::Triton => "Triton",
            Race::Bugbear => "Bugbear",
            Race::Goblin => "Goblin",
            Race::Hobgoblin => "Hobgoblin",
            Race::Kobold => "Kobold",
            Race::Orc => "Orc",
            Race::YuanTiPureblood => "Yuan-ti Pureblood",
            Race::Tortle => "Tortle",
            Race::Gith => "Gith",
            Race::Changeling => "Changeling",
            Race::Kalashtar => "Kalashtar",
            Race::Shifter => "Shifter",
            Race::Warforged => "Warforged",
            Race::Centaur => "Centaur",
            Race::Loxodon => "Loxodon",
            Race::Minotaur => "Minotaur",
            Race::SimicHybrid => "Simic Hybrid",
            Race::Vedalken => "Vedalken",
            Race::Verdan => "Verdan",
            Race::Locathah => "Locathah",
            Race::Grung => "Grung",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named combat or special ability (spells, class features, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialAbility {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uses_left: i32,
    #[serde(default)]
    pub effect: String,
}

/// Special abilities keyed by name
pub type SpecialAbilities = BTreeMap<String, SpecialAbility>;
