//! Scenario tests for whole encounters
//!
//! - Turn order: sorting, round cycling, condition decay, duplication
//! - Death saves: thresholds, instant death, damage while down
//! - Persistence: save/load round trips and legacy snapshots
//! - Undo: bounded history and exact restores

pub mod persistence;
pub mod turn_order;
pub mod undo;
