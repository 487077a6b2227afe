//! Action log
//!
//! Append-only narration of everything that happened in the encounter. The
//! log is best-effort: if the buffer cannot grow, new entries are dropped and
//! the command that produced them still succeeds.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::warn;

use super::combatant::CombatantId;

/// Maximum characters kept per message
pub const MESSAGE_LENGTH: usize = 127;

const INITIAL_CAPACITY: usize = 10;

/// One narrated event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub round: u32,
    pub turn_id: Option<CombatantId>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[R{}] {}", self.round, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the given round and turn holder
    ///
    /// Returns false if the entry was dropped.
    pub fn record(
        &mut self,
        round: u32,
        turn_id: Option<CombatantId>,
        message: impl Into<String>,
    ) -> bool {
        if self.entries.len() == self.entries.capacity() {
            let additional = self.entries.capacity().max(INITIAL_CAPACITY);
            if let Err(e) = self.entries.try_reserve_exact(additional) {
                warn!("Dropping log entry, buffer growth failed: {}", e);
                return false;
            }
        }

        let mut message: String = message.into();
        if let Some((cut, _)) = message.char_indices().nth(MESSAGE_LENGTH) {
            message.truncate(cut);
        }

        self.entries.push(LogEntry {
            round,
            turn_id,
            timestamp: Utc::now(),
            message,
        });
        true
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry in arrival order
    pub fn take(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Render entries as a bracketed export block
pub fn write_export<W: Write>(
    entries: &[LogEntry],
    out: &mut W,
    at: DateTime<Local>,
) -> io::Result<()> {
    let rule = "=".repeat(48);
    writeln!(out, "{}", rule)?;
    writeln!(out, "COMBAT LOG EXPORT: {}", at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "{}", rule)?;
    for entry in entries {
        writeln!(out, "{}", entry)?;
    }
    writeln!(out, "--- END OF LOG ---")?;
    writeln!(out)?;
    out.flush()
}
