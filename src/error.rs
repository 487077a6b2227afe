//! Error types
//!
//! Command validation and persistence failures. None of these are fatal: a
//! failed command leaves the session exactly as it was.

use thiserror::Error;

use crate::tracker::{CombatantId, Condition};

/// Reasons a command is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no combatants in the encounter")]
    Empty,

    #[error("no combatant selected")]
    NoSelection,

    #[error("combatant {0} not found")]
    NotFound(CombatantId),

    #[error("list full ({0} combatants)")]
    RegistryFull(usize),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("name cannot contain '{0}'")]
    InvalidName(char),

    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },

    #[error("cannot add {requested} combatants, only {available} slots free")]
    CapacityExceeded { requested: usize, available: usize },

    #[error("enable {0} first")]
    ConditionNotSet(Condition),

    #[error("{0} follows a player's hit points and cannot be changed directly")]
    DerivedCondition(Condition),

    #[error("{0} is not dying")]
    NotDying(String),

    #[error("nothing to undo")]
    NothingToUndo,
}

/// Save, load and export failures
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save file is empty")]
    EmptyFile,

    #[error("malformed header: {0}")]
    MalformedHeader(String),
}
