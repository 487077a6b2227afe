//! Encounter state engine
//!
//! The pieces that make up a tracked encounter:
//! - Combatant registry kept in initiative order
//! - Turn and round scheduling
//! - Status conditions with round-based durations
//! - Hit points and death saves
//! - Bounded undo history
//! - Narrated action log
//! - Dice rolling

mod combatant;
mod condition;
mod death;
mod dice;
mod log;
mod registry;
mod turn;
mod undo;

pub use combatant::{
    normalize_name, Combatant, CombatantId, DeathSaves, Faction, HpBand, NAME_LENGTH,
};
pub use condition::{decay_all, Condition, ConditionSet, Conditions, Expiry, NUM_CONDITIONS};
pub use death::{
    apply_hp_change, record_failure, roll_death_save, stabilize, DeathSave, HpChange, HpEffect,
    DEATH_SAVE_LIMIT,
};
pub use dice::{parse_dice, DiceRoll, DieRoller, ScriptedRoller, ThreadRoller};
pub use log::{write_export, ActionLog, LogEntry, MESSAGE_LENGTH};
pub use registry::{split_numbered_name, Duplication, Registry, MAX_COMBATANTS};
pub use turn::{TurnState, TurnStep};
pub use undo::{Snapshot, UndoStack, MAX_UNDO_STACK};
