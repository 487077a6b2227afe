//! Status conditions
//!
//! Tracks the fixed set of 15 conditions a combatant can carry, each with an
//! optional duration measured in rounds:
//! - A duration of 0 means the condition lasts until removed
//! - Positive durations count down once per round start
//! - A condition whose duration reaches 0 through decay is removed

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::combatant::{Combatant, CombatantId};

/// Number of tracked conditions
pub const NUM_CONDITIONS: usize = 15;

/// Status conditions, in their fixed enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Blinded,
    Charmed,
    Deafened,
    Frightened,
    Grappled,
    Incapacitated,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Invisible,
    Paralyzed,
    Petrified,
    Unconscious,
    Exhaustion,
}

impl Condition {
    /// All conditions in enumeration order
    pub const ALL: [Condition; NUM_CONDITIONS] = [
        Condition::Blinded,
        Condition::Charmed,
        Condition::Deafened,
        Condition::Frightened,
        Condition::Grappled,
        Condition::Incapacitated,
        Condition::Poisoned,
        Condition::Prone,
        Condition::Restrained,
        Condition::Stunned,
        Condition::Invisible,
        Condition::Paralyzed,
        Condition::Petrified,
        Condition::Unconscious,
        Condition::Exhaustion,
    ];

    /// Position in the enumeration (also the bit index when persisted)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a condition by its enumeration position
    pub fn from_index(index: usize) -> Option<Condition> {
        Self::ALL.get(index).copied()
    }

    fn bit(self) -> u16 {
        1 << self.index()
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Condition::Blinded => "Blinded",
            Condition::Charmed => "Charmed",
            Condition::Deafened => "Deafened",
            Condition::Frightened => "Frightened",
            Condition::Grappled => "Grappled",
            Condition::Incapacitated => "Incapacitated",
            Condition::Poisoned => "Poisoned",
            Condition::Prone => "Prone",
            Condition::Restrained => "Restrained",
            Condition::Stunned => "Stunned",
            Condition::Invisible => "Invisible",
            Condition::Paralyzed => "Paralyzed",
            Condition::Petrified => "Petrified",
            Condition::Unconscious => "Unconscious",
            Condition::Exhaustion => "Exhaustion",
        }
    }
}

impl FromStr for Condition {
    type Err = ();

    /// Accepts the display name case-insensitively, a short alias, or the
    /// 1-based position in the enumeration
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<usize>() {
            return n.checked_sub(1).and_then(Condition::from_index).ok_or(());
        }
        match s.as_str() {
            "blinded" | "blind" => Ok(Condition::Blinded),
            "charmed" | "charm" => Ok(Condition::Charmed),
            "deafened" | "deaf" => Ok(Condition::Deafened),
            "frightened" | "fear" | "scared" => Ok(Condition::Frightened),
            "grappled" | "grapple" => Ok(Condition::Grappled),
            "incapacitated" | "incap" => Ok(Condition::Incapacitated),
            "poisoned" | "poison" => Ok(Condition::Poisoned),
            "prone" => Ok(Condition::Prone),
            "restrained" | "restrain" => Ok(Condition::Restrained),
            "stunned" | "stun" => Ok(Condition::Stunned),
            "invisible" | "invis" => Ok(Condition::Invisible),
            "paralyzed" | "paralysed" | "para" => Ok(Condition::Paralyzed),
            "petrified" | "stone" => Ok(Condition::Petrified),
            "unconscious" | "ko" => Ok(Condition::Unconscious),
            "exhaustion" | "exhausted" => Ok(Condition::Exhaustion),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of conditions, stored as a bitmask over the enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ConditionSet(u16);

impl ConditionSet {
    const MASK: u16 = (1 << NUM_CONDITIONS) - 1;

    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a persisted bitmask; bits beyond the enumeration are dropped
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Bitmask for persistence
    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, condition: Condition) -> bool {
        self.0 & condition.bit() != 0
    }

    pub fn insert(&mut self, condition: Condition) {
        self.0 |= condition.bit();
    }

    pub fn remove(&mut self, condition: Condition) {
        self.0 &= !condition.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate set conditions in enumeration order
    pub fn iter(self) -> impl Iterator<Item = Condition> {
        Condition::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        let mut set = ConditionSet::new();
        for condition in iter {
            set.insert(condition);
        }
        set
    }
}

/// Conditions carried by one combatant, with their remaining durations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conditions {
    active: ConditionSet,
    durations: [u32; NUM_CONDITIONS],
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts; durations of unset conditions are dropped
    pub fn from_parts(active: ConditionSet, durations: [u32; NUM_CONDITIONS]) -> Self {
        let mut conditions = Self { active, durations };
        for condition in Condition::ALL {
            if !active.contains(condition) {
                conditions.durations[condition.index()] = 0;
            }
        }
        conditions
    }

    pub fn active(&self) -> ConditionSet {
        self.active
    }

    pub fn has(&self, condition: Condition) -> bool {
        self.active.contains(condition)
    }

    /// Remaining rounds for a condition (0 = indefinite or not set)
    pub fn duration(&self, condition: Condition) -> u32 {
        self.durations[condition.index()]
    }

    /// All duration counters in enumeration order
    pub fn durations(&self) -> &[u32; NUM_CONDITIONS] {
        &self.durations
    }

    /// Flip membership, returning whether the condition is now set
    ///
    /// Clearing a condition zeroes its duration.
    pub fn toggle(&mut self, condition: Condition) -> bool {
        if self.has(condition) {
            self.clear(condition);
            false
        } else {
            self.active.insert(condition);
            true
        }
    }

    /// Set a condition indefinitely (no-op if already set)
    pub fn apply(&mut self, condition: Condition) {
        self.active.insert(condition);
    }

    /// Remove a condition and its duration
    pub fn clear(&mut self, condition: Condition) {
        self.active.remove(condition);
        self.durations[condition.index()] = 0;
    }

    /// Set the remaining duration; only legal while the condition is set
    pub fn set_duration(&mut self, condition: Condition, rounds: u32) -> bool {
        if !self.has(condition) {
            return false;
        }
        self.durations[condition.index()] = rounds;
        true
    }

    /// Count every timed condition down by one round, returning those that expired
    pub fn tick_round(&mut self) -> Vec<Condition> {
        let mut expired = Vec::new();
        for condition in Condition::ALL {
            let remaining = &mut self.durations[condition.index()];
            if *remaining > 0 {
                *remaining -= 1;
                if *remaining == 0 {
                    self.active.remove(condition);
                    expired.push(condition);
                }
            }
        }
        expired
    }
}

/// A condition removed because its duration ran out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub id: CombatantId,
    pub name: String,
    pub condition: Condition,
}

/// Round-start decay across the whole encounter
pub fn decay_all<'a>(combatants: impl IntoIterator<Item = &'a mut Combatant>) -> Vec<Expiry> {
    let mut expired = Vec::new();
    for combatant in combatants {
        for condition in combatant.conditions.tick_round() {
            expired.push(Expiry {
                id: combatant.id,
                name: combatant.name.clone(),
                condition,
            });
        }
    }
    expired
}
