//! Turn scheduling
//!
//! The turn cursor walks the registry's canonical order as a cycle. Wrapping
//! forward past the last entry starts a new round; wrapping backward past
//! the first entry reverts one (never below round 1).
//!
//! The cursor and the selection are tracked by id, not position, so they
//! follow their combatant through re-sorts.

use serde::{Deserialize, Serialize};

use super::combatant::CombatantId;
use super::registry::Registry;

/// Where the cursor landed after a turn change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnStep {
    pub id: CombatantId,
    pub index: usize,
    /// Forward: a new round started. Backward: the round was reverted.
    pub wrapped: bool,
}

/// Round counter, turn cursor and selection cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub round: u32,
    pub current: Option<CombatantId>,
    pub selected: Option<CombatantId>,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            round: 1,
            current: None,
            selected: None,
        }
    }
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the turn to the next combatant in order
    pub fn advance_forward(&mut self, registry: &Registry) -> Option<TurnStep> {
        if registry.is_empty() {
            return None;
        }

        let (index, wrapped) = match self.current.and_then(|id| registry.index_of(id)) {
            None => (0, false),
            Some(i) if i + 1 >= registry.len() => (0, true),
            Some(i) => (i + 1, false),
        };
        if wrapped {
            self.round = self.round.saturating_add(1);
        }

        let id = registry.at(index)?.id;
        self.current = Some(id);
        self.selected = Some(id);
        Some(TurnStep { id, index, wrapped })
    }

    /// Hand the turn back to the previous combatant in order
    pub fn advance_backward(&mut self, registry: &Registry) -> Option<TurnStep> {
        if registry.is_empty() {
            return None;
        }

        let (index, wrapped) = match self.current.and_then(|id| registry.index_of(id)) {
            None => (0, false),
            Some(0) => {
                let reverted = self.round > 1;
                if reverted {
                    self.round -= 1;
                }
                (registry.len() - 1, reverted)
            }
            Some(i) => (i - 1, false),
        };

        let id = registry.at(index)?.id;
        self.current = Some(id);
        self.selected = Some(id);
        Some(TurnStep { id, index, wrapped })
    }

    /// Step the selection cursor cyclically, independent of the turn
    pub fn move_selection(&mut self, registry: &Registry, step: isize) -> Option<CombatantId> {
        if registry.is_empty() {
            self.selected = None;
            return None;
        }

        let len = registry.len();
        let index = match self.selected.and_then(|id| registry.index_of(id)) {
            None => 0,
            // Reduce first so huge steps cannot overflow
            Some(i) => (i + step.rem_euclid(len as isize) as usize) % len,
        };
        self.selected = registry.at(index).map(|c| c.id);
        self.selected
    }

    /// Bookkeeping after a combatant joined
    pub fn on_added(&mut self, id: CombatantId) {
        self.selected = Some(id);
        if self.current.is_none() {
            self.current = Some(id);
        }
    }

    /// Bookkeeping after the combatant at `index` left the registry
    pub fn on_removed(&mut self, removed: CombatantId, index: usize, registry: &Registry) {
        if registry.is_empty() {
            *self = Self::default();
            return;
        }

        if self.current == Some(removed) {
            self.current = registry.at(index % registry.len()).map(|c| c.id);
        }
        if self.selected == Some(removed) || self.selected.is_none() {
            self.selected = registry.at(index.min(registry.len() - 1)).map(|c| c.id);
        }
    }

    /// During round 1 the turn follows whoever now ranks first
    pub fn on_reordered(&mut self, registry: &Registry) {
        if self.round == 1 {
            if let Some(first) = registry.at(0) {
                self.current = Some(first.id);
            }
        }
    }

    /// Point dangling cursors back at real combatants
    pub fn repair(&mut self, registry: &Registry) {
        self.round = self.round.max(1);
        if registry.is_empty() {
            self.current = None;
            self.selected = None;
            self.round = 1;
            return;
        }
        if !self.current.is_some_and(|id| registry.contains(id)) {
            self.current = registry.at(0).map(|c| c.id);
        }
        if !self.selected.is_some_and(|id| registry.contains(id)) {
            self.selected = self.current;
        }
    }
}
