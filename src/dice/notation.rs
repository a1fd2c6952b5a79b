//! Dice notation such as "2d6+3", "d20" or "4d6-2"

use std::fmt;
use std::str::FromStr;

use super::{roll_pool, DiceError, RandomSource};

/// A parsed dice expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Flat modifier added to the sum
    pub modifier: i32,
}

/// Outcome of rolling a `DiceRoll`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    pub faces: Vec<u32>,
    pub total: i64,
}

impl DiceRoll {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Roll every die and keep the individual faces
    pub fn roll<S: RandomSource + ?Sized>(&self, source: &mut S) -> Result<RollOutcome, DiceError> {
        let faces = roll_pool(source, self.count, self.sides)?;
        let sum: i64 = faces.iter().map(|&f| i64::from(f)).sum();
        Ok(RollOutcome {
            faces,
            total: sum + i64::from(self.modifier),
        })
    }

    pub fn min(&self) -> i64 {
        i64::from(self.count) + i64::from(self.modifier)
    }

    pub fn max(&self) -> i64 {
        i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier)
    }

    /// Expected result, rounded down
    pub fn average(&self) -> i64 {
        (self.min() + self.max()).div_euclid(2)
    }
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation = s.trim().to_ascii_lowercase();
        let bad = |why: &str| DiceError::Notation(format!("{}: {}", why, s.trim()));

        let (count, rest) = notation
            .split_once('d')
            .ok_or_else(|| bad("missing 'd'"))?;

        // "d6" means one die
        let count: u32 = if count.is_empty() {
            1
        } else if is_digits(count) {
            count.parse().map_err(|_| bad("bad dice count"))?
        } else {
            return Err(bad("bad dice count"));
        };
        if count == 0 {
            return Err(bad("dice count must be at least 1"));
        }

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let (sides, modifier) = rest.split_at(pos);
                if !is_digits(&modifier[1..]) {
                    return Err(bad("bad modifier"));
                }
                let modifier = modifier
                    .strip_prefix('+')
                    .unwrap_or(modifier)
                    .parse::<i32>()
                    .map_err(|_| bad("bad modifier"))?;
                (sides, modifier)
            }
            None => (rest, 0),
        };

        if !is_digits(sides) {
            return Err(bad("bad die sides"));
        }
        let sides: u32 = sides.parse().map_err(|_| bad("bad die sides"))?;
        if sides == 0 {
            return Err(DiceError::NoSides);
        }

        Ok(Self::new(count, sides, modifier))
    }
}

/// Plain ASCII digits, no sign
fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{ScriptedSource, SeededSource};

    #[test]
    fn test_parse_basic() {
        assert_eq!("2d6".parse::<DiceRoll>().unwrap(), DiceRoll::new(2, 6, 0));
    }

    #[test]
    fn test_parse_modifiers() {
        assert_eq!("1d20+5".parse::<DiceRoll>().unwrap(), DiceRoll::new(1, 20, 5));
        assert_eq!("3d8-2".parse::<DiceRoll>().unwrap(), DiceRoll::new(3, 8, -2));
    }

    #[test]
    fn test_parse_implicit_count_and_case() {
        assert_eq!("d6".parse::<DiceRoll>().unwrap(), DiceRoll::new(1, 6, 0));
        assert_eq!(
            "  4D6-1 ".parse::<DiceRoll>().unwrap(),
            DiceRoll::new(4, 6, -1)
        );
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["abc", "2d", "d", "0d6", "2d6+", "2dx", "2d6-"] {
            assert!(bad.parse::<DiceRoll>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_parse_rejects_signed_parts() {
        for bad in ["+2d6", "-2d6", "2d+6", "2d6++3", "2d6+-3", " +d6"] {
            assert!(bad.parse::<DiceRoll>().is_err(), "{} should not parse", bad);
        }
        assert!(matches!("2d0".parse::<DiceRoll>(), Err(DiceError::NoSides)));
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceRoll::new(2, 6, 0).to_string(), "2d6");
        assert_eq!(DiceRoll::new(1, 20, 5).to_string(), "1d20+5");
        assert_eq!(DiceRoll::new(3, 8, -2).to_string(), "3d8-2");
    }

    #[test]
    fn test_min_max_average() {
        let roll = DiceRoll::new(2, 6, 3);
        assert_eq!(roll.min(), 5);
        assert_eq!(roll.max(), 15);
        assert_eq!(roll.average(), 10);
    }

    #[test]
    fn test_roll_scripted() {
        let mut source = ScriptedSource::new([4, 2]);
        let outcome = DiceRoll::new(2, 6, 3).roll(&mut source).unwrap();
        assert_eq!(outcome.faces, vec![4, 2]);
        assert_eq!(outcome.total, 9);
    }

    #[test]
    fn test_roll_bounds() {
        let roll = DiceRoll::new(3, 8, -2);
        let mut source = SeededSource::new(7);
        for _ in 0..100 {
            let outcome = roll.roll(&mut source).unwrap();
            assert_eq!(outcome.faces.len(), 3);
            assert!(outcome.total >= roll.min() && outcome.total <= roll.max());
        }
    }
}
