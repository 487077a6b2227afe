//! Undo history
//!
//! A bounded stack of full encounter snapshots. When full, pushing drops the
//! oldest snapshot. Popping hands back the newest one; there is no redo.

use std::collections::VecDeque;

use super::combatant::Combatant;
use super::turn::TurnState;

/// Default number of snapshots kept
pub const MAX_UNDO_STACK: usize = 10;

/// Full copy of the combatants and the turn/round/selection cursors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub combatants: Vec<Combatant>,
    pub turn: TurnState,
}

#[derive(Debug, Clone)]
pub struct UndoStack {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(MAX_UNDO_STACK)
    }
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a snapshot, evicting the oldest if at capacity
    pub fn push(&mut self, snapshot: Snapshot) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Take the most recent snapshot
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
