//! Random sources backing every die roll
//!
//! Nothing in the crate calls an ambient generator: callers hand a
//! `RandomSource` to the roller, which keeps randomized character creation
//! reproducible under test.

use std::collections::VecDeque;

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng, TryRngCore};

use super::DiceError;

/// Produces single die results
pub trait RandomSource: Send {
    /// Roll one die with `sides` faces, returning a value in `1..=sides`
    fn roll_die(&mut self, sides: u32) -> Result<u32, DiceError>;
}

fn check_sides(sides: u32) -> Result<(), DiceError> {
    if sides == 0 {
        return Err(DiceError::NoSides);
    }
    Ok(())
}

/// Operating system entropy
///
/// The only source that can fail at runtime; failures surface as
/// `DiceError::RandomSource`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSource;

impl RandomSource for OsSource {
    fn roll_die(&mut self, sides: u32) -> Result<u32, DiceError> {
        check_sides(sides)?;

        // Reject the tail of the u32 range so every face is equally likely
        let span = u64::from(sides);
        let zone = (1u64 << 32) - (1u64 << 32) % span;
        loop {
            let draw = OsRng
                .try_next_u32()
                .map_err(|e| DiceError::RandomSource(e.to_string()))?;
            let draw = u64::from(draw);
            if draw < zone {
                return Ok((draw % span) as u32 + 1);
            }
        }
    }
}

/// Deterministic generator seeded from a fixed value
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn roll_die(&mut self, sides: u32) -> Result<u32, DiceError> {
        check_sides(sides)?;
        Ok(self.rng.random_range(1..=sides))
    }
}

/// Replays a fixed list of die faces in order
///
/// Errors once the list runs dry, or when a scripted face does not fit the
/// die being rolled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    rolls: VecDeque<u32>,
}

impl ScriptedSource {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    /// Faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedSource {
    fn roll_die(&mut self, sides: u32) -> Result<u32, DiceError> {
        check_sides(sides)?;
        let face = self
            .rolls
            .pop_front()
            .ok_or_else(|| DiceError::RandomSource("scripted rolls exhausted".to_string()))?;
        if face == 0 || face > sides {
            return Err(DiceError::RandomSource(format!(
                "scripted face {} does not fit a d{}",
                face, sides
            )));
        }
        Ok(face)
    }
}
