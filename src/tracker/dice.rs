//! Dice rolling
//!
//! Parses and rolls dice notation like "1d20+3". All randomness flows through
//! a [`DieRoller`] so that a session can be driven deterministically.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Source of single die results
pub trait DieRoller {
    /// Roll one die with `sides` faces, returning a value in `1..=sides`
    fn roll(&mut self, sides: u32) -> u32;

    /// Roll a single d20
    fn d20(&mut self) -> u32 {
        self.roll(20)
    }
}

/// Roller backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRoller;

impl DieRoller for ThreadRoller {
    fn roll(&mut self, sides: u32) -> u32 {
        rand::rng().random_range(1..=sides.max(1))
    }
}

/// Roller that replays a fixed sequence of results
///
/// Once the queue is exhausted every roll returns `fallback`. Values are
/// clamped into the die's range.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    queue: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedRoller {
    /// Create a roller that returns `rolls` in order, then `fallback`
    pub fn new(rolls: impl IntoIterator<Item = u32>, fallback: u32) -> Self {
        Self {
            queue: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// Roller that always returns the same value
    pub fn constant(value: u32) -> Self {
        Self::new([], value)
    }

    /// Number of scripted results not yet consumed
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl DieRoller for ScriptedRoller {
    fn roll(&mut self, sides: u32) -> u32 {
        let value = self.queue.pop_front().unwrap_or(self.fallback);
        value.clamp(1, sides.max(1))
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

impl DiceRoll {
    /// `count`d`sides` plus `modifier`
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self { count, sides, modifier }
    }

    /// A single d20 plus a flat modifier
    pub fn d20(modifier: i32) -> Self {
        Self::new(1, 20, modifier)
    }

    /// Roll the dice with the given roller and return the total
    pub fn roll_with(&self, roller: &mut dyn DieRoller) -> i32 {
        let sum: i64 = (0..self.count).map(|_| roller.roll(self.sides) as i64).sum();
        (sum + self.modifier as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Lowest possible total
    pub fn min(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Highest possible total
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.modifier
    }
}

impl FromStr for DiceRoll {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// "[count]d<sides>[+/-modifier]", e.g. "d20", "2d6+3", "1d8 - 1"
static DICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d*)d(\d+)\s*(?:([+-])\s*(\d+))?$").expect("static regex")
});

/// Parse a dice notation string like "1d20+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, String> {
    let notation = notation.trim();
    let caps = DICE_REGEX
        .captures(notation)
        .ok_or_else(|| format!("Not dice notation: {}", notation))?;

    let count = match &caps[1] {
        "" => 1,
        digits => digits
            .parse::<u32>()
            .map_err(|_| format!("Invalid dice count: {}", digits))?,
    };
    if !(1..=100).contains(&count) {
        return Err("Dice count must be between 1 and 100".to_string());
    }

    let sides = caps[2]
        .parse::<u32>()
        .map_err(|_| format!("Invalid die sides: {}", &caps[2]))?;
    if !(1..=1000).contains(&sides) {
        return Err("Die sides must be between 1 and 1000".to_string());
    }

    let modifier = match (caps.get(3), caps.get(4)) {
        (Some(sign), Some(amount)) => {
            let amount = amount
                .as_str()
                .parse::<i32>()
                .map_err(|_| format!("Invalid modifier: {}", amount.as_str()))?;
            if sign.as_str() == "-" {
                -amount
            } else {
                amount
            }
        }
        _ => 0,
    };

    Ok(DiceRoll { count, sides, modifier })
}
