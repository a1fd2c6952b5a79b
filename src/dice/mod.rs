//! Dice rolling
//!
//! Every roll draws from an injected `RandomSource`:
//! - `OsSource` for live servers
//! - `SeededSource` for reproducible sessions
//! - `ScriptedSource` for tests that need exact faces

mod notation;
mod source;

use std::fmt;

use thiserror::Error;

pub use notation::{DiceRoll, RollOutcome};
pub use source::{OsSource, RandomSource, ScriptedSource, SeededSource};

/// Dice errors
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    #[error("die must have at least one side")]
    NoSides,

    #[error("invalid dice notation ({0})")]
    Notation(String),
}

/// The standard polyhedral dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Die {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl Die {
    pub fn sides(self) -> u32 {
        match self {
            Die::D4 => 4,
            Die::D6 => 6,
            Die::D8 => 8,
            Die::D10 => 10,
            Die::D12 => 12,
            Die::D20 => 20,
            Die::D100 => 100,
        }
    }

    pub fn roll<S: RandomSource + ?Sized>(self, source: &mut S) -> Result<u32, DiceError> {
        roll_die(source, self.sides())
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Roll a single die with the given number of sides
pub fn roll_die<S: RandomSource + ?Sized>(source: &mut S, sides: u32) -> Result<u32, DiceError> {
    source.roll_die(sides)
}

/// Roll `count` dice and keep every face
pub fn roll_pool<S: RandomSource + ?Sized>(
    source: &mut S,
    count: u32,
    sides: u32,
) -> Result<Vec<u32>, DiceError> {
    (0..count).map(|_| source.roll_die(sides)).collect()
}

/// Sum of `count` independent dice
pub fn roll_sum<S: RandomSource + ?Sized>(
    source: &mut S,
    count: u32,
    sides: u32,
) -> Result<u64, DiceError> {
    Ok(roll_pool(source, count, sides)?
        .iter()
        .map(|&face| u64::from(face))
        .sum())
}

/// Roll `count` dice and drop exactly one of the lowest faces
///
/// Duplicate lows only lose one copy: [1, 1, 6, 6] keeps 1 + 6 + 6.
pub fn roll_drop_lowest<S: RandomSource + ?Sized>(
    source: &mut S,
    count: u32,
    sides: u32,
) -> Result<u64, DiceError> {
    let faces = roll_pool(source, count, sides)?;
    let lowest = faces.iter().copied().min().unwrap_or(0);
    let total: u64 = faces.iter().map(|&face| u64::from(face)).sum();
    Ok(total - u64::from(lowest))
}
