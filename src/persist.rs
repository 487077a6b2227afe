//! Encounter persistence
//!
//! Snapshots are plain text, one encounter per file, pipe-delimited:
//!
//! ```text
//! round|next_id|count|current_turn_id|selected_id
//! id|name|type|initiative|dex|max_hp|hp|conditions|successes|failures|stable|dead|dur_0|...|dur_14
//! ```
//!
//! `type` is 0 for Player and 1 for Enemy; missing cursors are written as -1.
//! Older files without the four death-save fields are still accepted, and a
//! bad combatant line is skipped with a warning instead of failing the load.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PersistError;
use crate::tracker::{
    normalize_name, Combatant, CombatantId, ConditionSet, Conditions, DeathSaves, Faction,
    Registry, TurnState, DEATH_SAVE_LIMIT, NUM_CONDITIONS,
};

/// Identity and stat fields every combatant line must carry
const REQUIRED_FIELDS: usize = 8;
/// Fields in a current-format combatant line
const FULL_FIELDS: usize = REQUIRED_FIELDS + 4 + NUM_CONDITIONS;

/// Read-all / write-all access to a snapshot
pub trait LineStore {
    fn read_lines(&self) -> io::Result<Vec<String>>;
    fn write_lines(&self, lines: &[String]) -> io::Result<()>;
}

/// Snapshot stored in a file on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for appending, creating it if needed
    pub fn append(&self) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(BufWriter::new(file))
    }
}

impl LineStore for FileStore {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, lines: &[String]) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

/// Snapshot held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    lines: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: RefCell::new(lines),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl LineStore for MemoryStore {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        Ok(self.lines.borrow().clone())
    }

    fn write_lines(&self, lines: &[String]) -> io::Result<()> {
        *self.lines.borrow_mut() = lines.to_vec();
        Ok(())
    }
}

/// A combatant line that was skipped during load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWarning {
    /// 1-based line number in the file
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for LineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Parsed snapshot, not yet applied to a session
#[derive(Debug, Clone)]
pub struct Decoded {
    pub turn: TurnState,
    pub combatants: Vec<Combatant>,
    pub warnings: Vec<LineWarning>,
}

fn cursor_code(id: Option<CombatantId>) -> i32 {
    id.map_or(-1, |id| id.0)
}

fn cursor_from(code: i32) -> Option<CombatantId> {
    (code > 0).then_some(CombatantId(code))
}

/// Serialize the registry and cursors into snapshot lines
pub fn encode(registry: &Registry, turn: &TurnState) -> Vec<String> {
    let mut lines = Vec::with_capacity(registry.len() + 1);
    lines.push(format!(
        "{}|{}|{}|{}|{}",
        turn.round,
        registry.next_id(),
        registry.len(),
        cursor_code(turn.current),
        cursor_code(turn.selected),
    ));

    for c in registry.iter() {
        let mut line = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            c.id.0,
            c.name,
            c.faction.code(),
            c.initiative,
            c.dexterity,
            c.max_hp,
            c.hp,
            c.conditions.active().bits(),
            c.death_saves.successes,
            c.death_saves.failures,
            u8::from(c.is_stable),
            u8::from(c.is_dead),
        );
        for duration in c.conditions.durations() {
            line.push('|');
            line.push_str(&duration.to_string());
        }
        lines.push(line);
    }
    lines
}

/// Header fields as (round, current, selected); the id counter is recomputed on load
fn parse_header(line: &str) -> Result<(u32, i32, i32), PersistError> {
    let fields: Vec<i64> = line
        .split('|')
        .map(|f| f.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| PersistError::MalformedHeader(line.to_string()))?;

    if fields.len() < 5 {
        return Err(PersistError::MalformedHeader(line.to_string()));
    }
    let as_i32 = |v: i64| i32::try_from(v).unwrap_or(-1);
    let round = u32::try_from(fields[0]).unwrap_or(1).max(1);
    Ok((round, as_i32(fields[3]), as_i32(fields[4])))
}

/// Optional numeric field: absent or unparseable values read as 0
fn optional_field(fields: &[&str], index: usize) -> i64 {
    fields
        .get(index)
        .and_then(|f| f.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn parse_combatant(line: &str) -> Result<Combatant, String> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < REQUIRED_FIELDS {
        return Err(format!(
            "expected at least {} fields, found {}",
            REQUIRED_FIELDS,
            fields.len()
        ));
    }

    let int = |index: usize, what: &str| -> Result<i32, String> {
        fields[index]
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid {}: {:?}", what, fields[index]))
    };

    let id = int(0, "id")?;
    if id <= 0 {
        return Err(format!("invalid id: {}", id));
    }
    let name = normalize_name(fields[1]);
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    let faction = Faction::from_code(int(2, "type")? as i64)
        .ok_or_else(|| format!("invalid type: {:?}", fields[2]))?;
    let initiative = int(3, "initiative")?;
    let dexterity = int(4, "dexterity")?;
    let max_hp = int(5, "max hp")?;
    if max_hp < 1 {
        return Err(format!("invalid max hp: {}", max_hp));
    }
    let hp = int(6, "hp")?.clamp(0, max_hp);
    let bits = fields[7]
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("invalid conditions: {:?}", fields[7]))?;

    let (death_fields, duration_start) = if fields.len() >= FULL_FIELDS {
        (Some(REQUIRED_FIELDS), REQUIRED_FIELDS + 4)
    } else {
        (None, REQUIRED_FIELDS)
    };

    let mut durations = [0u32; NUM_CONDITIONS];
    for (i, slot) in durations.iter_mut().enumerate() {
        let value = optional_field(&fields, duration_start + i);
        *slot = u32::try_from(value).unwrap_or(0);
    }

    let mut combatant =
        Combatant::new(CombatantId(id), name, faction, initiative, dexterity, max_hp);
    combatant.hp = hp;
    combatant.conditions = Conditions::from_parts(ConditionSet::from_bits(bits), durations);

    if let Some(start) = death_fields {
        let counter = |i: usize| {
            optional_field(&fields, start + i).clamp(0, DEATH_SAVE_LIMIT as i64) as u8
        };
        combatant.death_saves = DeathSaves {
            successes: counter(0),
            failures: counter(1),
        };
        combatant.is_stable = optional_field(&fields, start + 2) != 0;
        combatant.is_dead = optional_field(&fields, start + 3) != 0;
    }

    Ok(combatant)
}

/// Parse snapshot lines
///
/// Only a missing or malformed header fails the whole decode; bad combatant
/// lines are reported in [`Decoded::warnings`].
pub fn decode(lines: &[String]) -> Result<Decoded, PersistError> {
    let mut numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches(['\r', '\n'])))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = numbered.next().ok_or(PersistError::EmptyFile)?;
    let (round, current, selected) = parse_header(header)?;

    let mut combatants = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (line_no, line) in numbered {
        match parse_combatant(line) {
            Ok(c) if !seen.insert(c.id) => {
                warnings.push(LineWarning {
                    line: line_no,
                    reason: format!("duplicate id {}", c.id.0),
                });
            }
            Ok(c) => combatants.push(c),
            Err(reason) => warnings.push(LineWarning {
                line: line_no,
                reason,
            }),
        }
    }

    for warning in &warnings {
        warn!("Skipping combatant at {}", warning);
    }

    Ok(Decoded {
        turn: TurnState {
            round,
            current: cursor_from(current),
            selected: cursor_from(selected),
        },
        combatants,
        warnings,
    })
}
