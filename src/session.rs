//! Encounter session
//!
//! [`Session`] owns the whole encounter: registry, turn cursor, undo history,
//! action log and dice. Every mutation goes through [`Session::execute`],
//! which validates the command, applies it, narrates it to the action log and
//! records an undo snapshot when the command succeeds.

use std::io::Write;

use chrono::Local;
use tracing::{debug, info};

use crate::error::{CommandError, PersistError};
use crate::persist::{self, LineStore, LineWarning};
use crate::tracker::{
    apply_hp_change, decay_all, roll_death_save, stabilize, write_export, ActionLog, Combatant,
    CombatantId, Condition, DeathSave, DiceRoll, DieRoller, Duplication, Faction, HpChange,
    HpEffect, LogEntry, Registry, Snapshot, ThreadRoller, TurnState, TurnStep, UndoStack,
    DEATH_SAVE_LIMIT, MAX_COMBATANTS, MAX_UNDO_STACK,
};

/// Capacity limits for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_combatants: usize,
    pub undo_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_combatants: MAX_COMBATANTS,
            undo_depth: MAX_UNDO_STACK,
        }
    }
}

/// Which combatant a command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Whoever the selection cursor points at
    Selected,
    Id(CombatantId),
}

impl From<CombatantId> for Target {
    fn from(id: CombatantId) -> Self {
        Target::Id(id)
    }
}

/// Everything a facilitator can do to an encounter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        faction: Faction,
        name: String,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    },
    /// Caller is responsible for confirming with the user first
    Remove { target: Target },
    Duplicate { target: Target, count: usize },
    /// Negative delta is damage, positive is healing
    ChangeHp {
        target: Target,
        delta: i32,
        critical: bool,
    },
    RerollInitiative { target: Target, value: i32 },
    ToggleCondition { target: Target, condition: Condition },
    SetConditionDuration {
        target: Target,
        condition: Condition,
        rounds: i32,
    },
    NextTurn,
    PreviousTurn,
    MoveSelection(isize),
    Select(CombatantId),
    RollDeathSave { target: Target },
    Stabilize { target: Target },
    Undo,
}

impl Command {
    /// Whether a successful run should be undoable
    ///
    /// Everything that can change combatants, the turn cursor or the round
    /// is; cursor-only moves and undo itself are not.
    pub fn is_undoable(&self) -> bool {
        !matches!(
            self,
            Command::MoveSelection(_) | Command::Select(_) | Command::Undo
        )
    }
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(CombatantId),
    Removed(Combatant),
    Duplicated(Duplication),
    HpChanged { id: CombatantId, change: HpChange },
    InitiativeChanged { id: CombatantId, old: i32, new: i32 },
    ConditionToggled {
        id: CombatantId,
        condition: Condition,
        active: bool,
    },
    DurationSet {
        id: CombatantId,
        condition: Condition,
        rounds: u32,
    },
    TurnChanged {
        step: TurnStep,
        expired: Vec<(CombatantId, Condition)>,
        /// Death save rolled automatically for a dying Player
        death_save: Option<(u32, DeathSave)>,
    },
    Selected(CombatantId),
    DeathSaveRolled {
        id: CombatantId,
        roll: u32,
        result: DeathSave,
    },
    Stabilized(CombatantId),
    Undone { round: u32 },
}

/// Result of loading a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub warnings: Vec<LineWarning>,
}

/// One tracked encounter
pub struct Session {
    registry: Registry,
    turn: TurnState,
    undo: UndoStack,
    log: ActionLog,
    roller: Box<dyn DieRoller>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("turn", &self.turn)
            .field("undo", &self.undo.len())
            .field("log", &self.log.len())
            .finish()
    }
}

impl Session {
    /// Empty encounter with default limits and random dice
    pub fn new() -> Self {
        Self::with_roller(Limits::default(), ThreadRoller)
    }

    /// Empty encounter with the given limits and dice
    pub fn with_roller(limits: Limits, roller: impl DieRoller + 'static) -> Self {
        Self {
            registry: Registry::new(limits.max_combatants),
            turn: TurnState::new(),
            undo: UndoStack::new(limits.undo_depth),
            log: ActionLog::new(),
            roller: Box::new(roller),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Combatants in turn order
    pub fn combatants(&self) -> &[Combatant] {
        self.registry.as_slice()
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.registry.get(id)
    }

    pub fn round(&self) -> u32 {
        self.turn.round
    }

    pub fn current_turn(&self) -> Option<CombatantId> {
        self.turn.current
    }

    pub fn selected(&self) -> Option<CombatantId> {
        self.turn.selected
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        self.log.entries()
    }

    /// Number of undo snapshots available
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Roll dice with the session's roller
    pub fn roll(&mut self, dice: &DiceRoll) -> i32 {
        dice.roll_with(self.roller.as_mut())
    }

    /// Full copy of the undoable state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            combatants: self.registry.as_slice().to_vec(),
            turn: self.turn,
        }
    }

    fn note(&mut self, message: impl Into<String>) {
        self.log.record(self.turn.round, self.turn.current, message);
    }

    fn resolve(&self, target: Target) -> Result<CombatantId, CommandError> {
        match target {
            Target::Selected => self
                .turn
                .selected
                .filter(|id| self.registry.contains(*id))
                .ok_or(CommandError::NoSelection),
            Target::Id(id) if self.registry.contains(id) => Ok(id),
            Target::Id(id) => Err(CommandError::NotFound(id)),
        }
    }

    fn combatant_mut(&mut self, id: CombatantId) -> Result<&mut Combatant, CommandError> {
        self.registry.get_mut(id).ok_or(CommandError::NotFound(id))
    }

    /// Validate and apply one command
    ///
    /// A rejected command leaves the session untouched, including the undo
    /// stack and the action log.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, CommandError> {
        debug!(?command, "executing command");
        let snapshot = command.is_undoable().then(|| self.snapshot());

        let outcome = match command {
            Command::Add {
                faction,
                name,
                initiative,
                dexterity,
                max_hp,
            } => self.add(faction, &name, initiative, dexterity, max_hp),
            Command::Remove { target } => self.remove(target),
            Command::Duplicate { target, count } => self.duplicate(target, count),
            Command::ChangeHp {
                target,
                delta,
                critical,
            } => self.change_hp(target, delta, critical),
            Command::RerollInitiative { target, value } => self.reroll_initiative(target, value),
            Command::ToggleCondition { target, condition } => {
                self.toggle_condition(target, condition)
            }
            Command::SetConditionDuration {
                target,
                condition,
                rounds,
            } => self.set_condition_duration(target, condition, rounds),
            Command::NextTurn => self.next_turn(),
            Command::PreviousTurn => self.previous_turn(),
            Command::MoveSelection(step) => self.move_selection(step),
            Command::Select(id) => self.select(id),
            Command::RollDeathSave { target } => self.roll_death_save(target),
            Command::Stabilize { target } => self.stabilize(target),
            Command::Undo => self.undo(),
        }?;

        if let Some(snapshot) = snapshot {
            self.undo.push(snapshot);
        }
        Ok(outcome)
    }

    fn add(
        &mut self,
        faction: Faction,
        name: &str,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> Result<Outcome, CommandError> {
        let id = self
            .registry
            .add(faction, name, initiative, dexterity, max_hp)?;
        self.turn.on_added(id);

        let name = self.registry.get(id).map(|c| c.name.clone()).unwrap_or_default();
        self.note(format!("Added {}: Init {}, HP {}.", name, initiative, max_hp));
        Ok(Outcome::Added(id))
    }

    fn remove(&mut self, target: Target) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let name = self.registry.get(id).map(|c| c.name.clone()).unwrap_or_default();
        self.note(format!("Removed {}.", name));

        let (index, removed) = self.registry.remove(id).ok_or(CommandError::NotFound(id))?;
        self.turn.on_removed(id, index, &self.registry);
        Ok(Outcome::Removed(removed))
    }

    fn duplicate(&mut self, target: Target, count: usize) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let template_name = self.registry.get(id).map(|c| c.name.clone()).unwrap_or_default();
        let duplication = self.registry.duplicate(id, count, self.roller.as_mut())?;

        if let Some(renamed) = &duplication.renamed_template {
            self.note(format!("{} renamed to {}.", template_name, renamed));
        }
        for (_, name, initiative) in &duplication.copies {
            self.note(format!("Added {}: Init {} (rolled).", name, initiative));
        }
        Ok(Outcome::Duplicated(duplication))
    }

    fn change_hp(
        &mut self,
        target: Target,
        delta: i32,
        critical: bool,
    ) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let combatant = self.combatant_mut(id)?;
        let change = apply_hp_change(combatant, delta, critical);
        let (name, hp, max_hp) = (combatant.name.clone(), combatant.hp, combatant.max_hp);

        if delta > 0 {
            self.note(format!("{} healed {} HP ({}/{}).", name, delta, hp, max_hp));
        } else if delta < 0 {
            self.note(format!(
                "{} took {} damage ({}/{}).",
                name,
                -(delta as i64),
                hp,
                max_hp
            ));
        }

        match change.effect {
            HpEffect::None => {}
            HpEffect::Downed => self.note(format!("{} is UNCONSCIOUS.", name)),
            HpEffect::InstantDeath => self.note(format!("{} is killed outright!", name)),
            HpEffect::DamagedWhileDown {
                failures,
                was_stable,
                died,
            } => {
                if was_stable {
                    self.note(format!("{} is no longer stable.", name));
                }
                self.note(format!(
                    "{} suffers a death save failure ({}/{}).",
                    name, failures, DEATH_SAVE_LIMIT
                ));
                if died {
                    self.note(format!("{} has DIED.", name));
                }
            }
            HpEffect::Defeated => self.note(format!("{} is defeated.", name)),
            HpEffect::Revived { was_dead } => {
                if was_dead {
                    self.note(format!("{} is brought back from death.", name));
                }
                self.note(format!("{} is no longer unconscious.", name));
            }
        }

        Ok(Outcome::HpChanged { id, change })
    }

    fn reroll_initiative(&mut self, target: Target, value: i32) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let old = self
            .registry
            .set_initiative(id, value)
            .ok_or(CommandError::NotFound(id))?;
        self.turn.on_reordered(&self.registry);

        let name = self.registry.get(id).map(|c| c.name.clone()).unwrap_or_default();
        self.note(format!("{} rerolled initiative from {} to {}.", name, old, value));
        Ok(Outcome::InitiativeChanged { id, old, new: value })
    }

    fn check_derived(combatant: &Combatant, condition: Condition) -> Result<(), CommandError> {
        if condition == Condition::Unconscious && combatant.is_player() {
            return Err(CommandError::DerivedCondition(condition));
        }
        Ok(())
    }

    fn toggle_condition(
        &mut self,
        target: Target,
        condition: Condition,
    ) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let combatant = self.combatant_mut(id)?;
        Self::check_derived(combatant, condition)?;

        let active = combatant.conditions.toggle(condition);
        let name = combatant.name.clone();
        let verb = if active { "applied" } else { "removed" };
        self.note(format!("{}: {} {}.", name, condition, verb));
        Ok(Outcome::ConditionToggled { id, condition, active })
    }

    fn set_condition_duration(
        &mut self,
        target: Target,
        condition: Condition,
        rounds: i32,
    ) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let rounds = u32::try_from(rounds).map_err(|_| CommandError::OutOfRange {
            what: "duration",
            value: rounds as i64,
        })?;
        let combatant = self.combatant_mut(id)?;
        Self::check_derived(combatant, condition)?;

        if !combatant.conditions.set_duration(condition, rounds) {
            return Err(CommandError::ConditionNotSet(condition));
        }
        let name = combatant.name.clone();
        self.note(format!("{}: {} duration set to {}.", name, condition, rounds));
        Ok(Outcome::DurationSet { id, condition, rounds })
    }

    fn next_turn(&mut self) -> Result<Outcome, CommandError> {
        let step = self
            .turn
            .advance_forward(&self.registry)
            .ok_or(CommandError::Empty)?;

        let mut expired = Vec::new();
        if step.wrapped {
            for expiry in decay_all(self.registry.iter_mut()) {
                self.note(format!("{}: {} duration ended.", expiry.name, expiry.condition));
                expired.push((expiry.id, expiry.condition));
            }
            self.note(format!("--- START OF ROUND {} ---", self.turn.round));
        }

        let name = self.registry.get(step.id).map(|c| c.name.clone()).unwrap_or_default();
        self.note(format!("{}'s turn.", name));

        let death_save = if self.registry.get(step.id).is_some_and(Combatant::is_dying) {
            let roll = self.roller.d20();
            let combatant = self.combatant_mut(step.id)?;
            let result = roll_death_save(combatant, roll)?;
            self.narrate_death_save(&name, roll, result);
            Some((roll, result))
        } else {
            None
        };

        Ok(Outcome::TurnChanged {
            step,
            expired,
            death_save,
        })
    }

    fn previous_turn(&mut self) -> Result<Outcome, CommandError> {
        let step = self
            .turn
            .advance_backward(&self.registry)
            .ok_or(CommandError::Empty)?;

        if step.wrapped {
            self.note(format!("--- END OF ROUND {} (Revert) ---", self.turn.round));
        }
        let name = self.registry.get(step.id).map(|c| c.name.clone()).unwrap_or_default();
        self.note(format!("Turn reverted to {}.", name));

        Ok(Outcome::TurnChanged {
            step,
            expired: Vec::new(),
            death_save: None,
        })
    }

    fn move_selection(&mut self, step: isize) -> Result<Outcome, CommandError> {
        self.turn
            .move_selection(&self.registry, step)
            .map(Outcome::Selected)
            .ok_or(CommandError::Empty)
    }

    fn select(&mut self, id: CombatantId) -> Result<Outcome, CommandError> {
        if !self.registry.contains(id) {
            return Err(CommandError::NotFound(id));
        }
        self.turn.selected = Some(id);
        Ok(Outcome::Selected(id))
    }

    fn narrate_death_save(&mut self, name: &str, roll: u32, result: DeathSave) {
        match result {
            DeathSave::Recovered => {
                self.note(format!("{} rolls a natural 20 on a death save and regains 1 HP!", name));
            }
            DeathSave::Success { successes, stable } => {
                self.note(format!(
                    "{} death save: {} (success {}/{}).",
                    name, roll, successes, DEATH_SAVE_LIMIT
                ));
                if stable {
                    self.note(format!("{} is STABLE.", name));
                }
            }
            DeathSave::Failure { failures, dead, .. } => {
                self.note(format!(
                    "{} death save: {} (failure {}/{}).",
                    name, roll, failures, DEATH_SAVE_LIMIT
                ));
                if dead {
                    self.note(format!("{} has DIED.", name));
                }
            }
        }
    }

    fn roll_death_save(&mut self, target: Target) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let combatant = self.combatant_mut(id)?;
        if !combatant.is_dying() {
            return Err(CommandError::NotDying(combatant.name.clone()));
        }
        let name = combatant.name.clone();

        let roll = self.roller.d20();
        let result = roll_death_save(self.combatant_mut(id)?, roll)?;
        self.narrate_death_save(&name, roll, result);
        Ok(Outcome::DeathSaveRolled { id, roll, result })
    }

    fn stabilize(&mut self, target: Target) -> Result<Outcome, CommandError> {
        let id = self.resolve(target)?;
        let combatant = self.combatant_mut(id)?;
        stabilize(combatant)?;
        let name = combatant.name.clone();
        self.note(format!("{} is STABLE.", name));
        Ok(Outcome::Stabilized(id))
    }

    fn undo(&mut self) -> Result<Outcome, CommandError> {
        let snapshot = self.undo.pop().ok_or(CommandError::NothingToUndo)?;
        self.registry.restore(snapshot.combatants);
        self.turn = snapshot.turn;
        self.note(format!(
            "Action UNDONE. Reverted to start of Round {}.",
            self.turn.round
        ));
        Ok(Outcome::Undone {
            round: self.turn.round,
        })
    }

    /// Serialize the encounter into snapshot lines
    pub fn save_lines(&self) -> Vec<String> {
        persist::encode(&self.registry, &self.turn)
    }

    /// Write the encounter to a store
    pub fn save(&self, store: &dyn LineStore) -> Result<(), PersistError> {
        store.write_lines(&self.save_lines())?;
        info!(combatants = self.registry.len(), round = self.turn.round, "encounter saved");
        Ok(())
    }

    /// Replace the encounter with a decoded snapshot
    ///
    /// Clears the undo stack and the action log. On error nothing changes.
    pub fn load_lines(&mut self, lines: &[String]) -> Result<LoadReport, PersistError> {
        let decoded = persist::decode(lines)?;

        let mut warnings = decoded.warnings;
        let capacity = self.registry.capacity();
        if decoded.combatants.len() > capacity {
            warnings.push(LineWarning {
                line: 0,
                reason: format!(
                    "{} combatants dropped, list holds {}",
                    decoded.combatants.len() - capacity,
                    capacity
                ),
            });
        }

        self.registry.load(decoded.combatants);
        self.turn = decoded.turn;
        self.turn.repair(&self.registry);
        self.undo.clear();
        self.log.clear();

        self.note(format!(
            "Game loaded from save file. Round set to {}.",
            self.turn.round
        ));
        info!(
            combatants = self.registry.len(),
            skipped = warnings.len(),
            "encounter loaded"
        );
        Ok(LoadReport {
            loaded: self.registry.len(),
            warnings,
        })
    }

    /// Read and apply a snapshot from a store
    pub fn load(&mut self, store: &dyn LineStore) -> Result<LoadReport, PersistError> {
        let lines = store.read_lines()?;
        self.load_lines(&lines)
    }

    /// Write the action log to a sink and clear it
    ///
    /// The log is only cleared if the whole export was written.
    pub fn export_log<W: Write>(&mut self, out: &mut W) -> Result<usize, PersistError> {
        write_export(self.log.entries(), out, Local::now())?;
        let exported = self.log.take().len();
        info!(entries = exported, "action log exported");
        Ok(exported)
    }
}
