//! Combatant registry
//!
//! Owns every combatant in the encounter. Storage order is always the
//! canonical turn order:
//! - Initiative, highest first
//! - Dexterity, highest first
//! - Id, lowest first
//!
//! Lookups are linear scans; the registry never holds more than a few dozen
//! entries.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::combatant::{normalize_name, Combatant, CombatantId, Faction, NAME_LENGTH};
use super::dice::{DiceRoll, DieRoller};
use crate::error::CommandError;

/// Hard upper bound on tracked combatants
pub const MAX_COMBATANTS: usize = 50;

/// Name ending in a number, e.g. "Goblin 3" or "Goblin3"
static NUMBERED_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?\S)\s*(\d+)$").expect("static regex"));

/// Split "Goblin 3" into ("Goblin", Some(3)); names without a suffix return None
pub fn split_numbered_name(name: &str) -> (&str, Option<u32>) {
    match NUMBERED_NAME_REGEX.captures(name) {
        Some(caps) => {
            let base = caps.get(1).map_or(name, |m| m.as_str());
            let number = caps.get(2).and_then(|m| m.as_str().parse().ok());
            match number {
                Some(n) => (base, Some(n)),
                None => (name, None),
            }
        }
        None => (name, None),
    }
}

/// "<base> <k>", with the base shortened so the whole name fits
fn numbered_name(base: &str, k: u32) -> String {
    let suffix = format!(" {}", k);
    let room = NAME_LENGTH.saturating_sub(suffix.len());
    let base: String = base.chars().take(room).collect();
    format!("{}{}", base.trim_end(), suffix)
}

/// Outcome of duplicating a combatant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplication {
    /// New name of the template, if it had to be numbered
    pub renamed_template: Option<String>,
    /// The copies created: id, name, rolled initiative
    pub copies: Vec<(CombatantId, String, i32)>,
}

/// Arena of combatants kept in turn order
#[derive(Debug, Clone)]
pub struct Registry {
    combatants: Vec<Combatant>,
    next_id: i32,
    capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(MAX_COMBATANTS)
    }
}

impl Registry {
    /// Create an empty registry holding at most `capacity` combatants
    pub fn new(capacity: usize) -> Self {
        Self {
            combatants: Vec::new(),
            next_id: 1,
            capacity: capacity.clamp(1, MAX_COMBATANTS),
        }
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots left
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.combatants.len())
    }

    /// Id the next added combatant will receive (before collision skipping)
    pub fn next_id(&self) -> i32 {
        self.next_id
    }

    /// Combatants in turn order
    pub fn as_slice(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Combatant> {
        self.combatants.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Combatant> {
        self.combatants.iter_mut()
    }

    /// Position of a combatant in turn order
    pub fn index_of(&self, id: CombatantId) -> Option<usize> {
        self.combatants.iter().position(|c| c.id == id)
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Combatant> {
        self.combatants.get(index)
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.get(id).is_some()
    }

    /// Restore canonical order
    pub fn sort(&mut self) {
        self.combatants.sort_by(|a, b| {
            b.initiative
                .cmp(&a.initiative)
                .then_with(|| b.dexterity.cmp(&a.dexterity))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Hand out a fresh id, wrapping to 1 on overflow and skipping ids in use
    fn allocate_id(&mut self) -> CombatantId {
        loop {
            if self.next_id <= 0 || self.next_id == i32::MAX {
                self.next_id = 1;
            }
            let id = CombatantId(self.next_id);
            self.next_id += 1;
            if !self.contains(id) {
                return id;
            }
        }
    }

    fn validate_name(name: &str) -> Result<String, CommandError> {
        if let Some(bad) = name.chars().find(|ch| *ch == '|' || ch.is_control()) {
            return Err(CommandError::InvalidName(bad));
        }
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(CommandError::EmptyName);
        }
        Ok(name)
    }

    /// Add a new combatant at full HP and return its id
    pub fn add(
        &mut self,
        faction: Faction,
        name: &str,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> Result<CombatantId, CommandError> {
        if self.available() == 0 {
            return Err(CommandError::RegistryFull(self.capacity));
        }
        let name = Self::validate_name(name)?;
        if max_hp < 1 {
            return Err(CommandError::OutOfRange {
                what: "max HP",
                value: max_hp as i64,
            });
        }

        let id = self.allocate_id();
        debug!(%id, %name, initiative, "adding combatant");
        self.combatants
            .push(Combatant::new(id, name, faction, initiative, dexterity, max_hp));
        self.sort();
        Ok(id)
    }

    /// Remove a combatant, returning its former position and record
    pub fn remove(&mut self, id: CombatantId) -> Option<(usize, Combatant)> {
        let index = self.index_of(id)?;
        Some((index, self.combatants.remove(index)))
    }

    /// Add `count` fresh copies of a combatant with rolled initiative
    pub fn duplicate(
        &mut self,
        id: CombatantId,
        count: usize,
        roller: &mut dyn DieRoller,
    ) -> Result<Duplication, CommandError> {
        let template = self.get(id).cloned().ok_or(CommandError::NotFound(id))?;
        if count == 0 {
            return Err(CommandError::OutOfRange {
                what: "duplicate count",
                value: 0,
            });
        }
        if count > self.available() {
            return Err(CommandError::CapacityExceeded {
                requested: count,
                available: self.available(),
            });
        }

        let (base, suffix) = split_numbered_name(&template.name);
        let base = base.to_string();

        let mut used: BTreeSet<u32> = self
            .combatants
            .iter()
            .filter_map(|c| match split_numbered_name(&c.name) {
                (b, Some(n)) if b == base => Some(n),
                _ => None,
            })
            .collect();

        let renamed_template = if suffix.is_none() {
            let new_name = numbered_name(&base, 1);
            used.insert(1);
            if let Some(t) = self.get_mut(id) {
                t.name = new_name.clone();
            }
            Some(new_name)
        } else {
            None
        };

        let initiative_roll = DiceRoll::d20(template.dexterity);
        let mut copies = Vec::with_capacity(count);
        let mut k = 1;
        for _ in 0..count {
            while used.contains(&k) {
                k += 1;
            }
            used.insert(k);
            let name = numbered_name(&base, k);
            let initiative = initiative_roll.roll_with(roller);
            let copy_id = self.allocate_id();
            self.combatants
                .push(template.arrival(copy_id, name.clone(), initiative));
            copies.push((copy_id, name, initiative));
        }

        self.sort();
        Ok(Duplication {
            renamed_template,
            copies,
        })
    }

    /// Change a combatant's initiative and re-sort, returning the old value
    pub fn set_initiative(&mut self, id: CombatantId, value: i32) -> Option<i32> {
        let combatant = self.get_mut(id)?;
        let old = std::mem::replace(&mut combatant.initiative, value);
        self.sort();
        Some(old)
    }

    /// Replace the whole contents, e.g. from an undo snapshot
    ///
    /// The id counter only moves forward so ids are never handed out twice.
    pub fn restore(&mut self, combatants: Vec<Combatant>) {
        self.combatants = combatants;
        let floor = self.max_id().saturating_add(1);
        if self.next_id < floor {
            self.next_id = floor;
        }
    }

    /// Replace the contents with loaded combatants and recompute the id counter
    pub fn load(&mut self, mut combatants: Vec<Combatant>) {
        combatants.truncate(self.capacity);
        self.combatants = combatants;
        self.next_id = self.max_id().saturating_add(1);
        self.sort();
    }

    fn max_id(&self) -> i32 {
        self.combatants.iter().map(|c| c.id.0).max().unwrap_or(0)
    }
}
