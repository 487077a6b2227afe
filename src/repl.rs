//! Line-oriented command front end
//!
//! Reads one command per line, runs it against a [`Session`] and prints what
//! happened. This is the thin shell around the engine used by the binary.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::persist::FileStore;
use crate::session::{Command, Outcome, Session, Target};
use crate::tracker::{
    parse_dice, Combatant, CombatantId, Condition, DiceRoll, Faction, HpEffect,
};

const HELP: &str = "\
commands:
  add <p|e> <name> <init|dice> <dex> <hp>   add a combatant
  rm [id]                                  remove a combatant
  dup <count> [id]                         add numbered copies
  hp <+heal|-dmg> [id] [crit]              change hit points
  init <value|dice> [id]                   set initiative
  cond <condition> [id]                    toggle a condition
  dur <condition> <rounds> [id]            set a condition's duration
  next | prev                              advance or revert the turn
  up | down | sel <id>                     move the selection
  death [id] | stab [id]                   roll a death save or stabilize
  undo                                     revert the last change
  save | load | export                     snapshot file and log export
  list | log | json                        show the encounter
  quit";

/// Reasons an input line could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("not a number: '{0}'")]
    BadNumber(String),

    #[error("unknown faction '{0}', use p or e")]
    BadFaction(String),

    #[error("unknown condition '{0}'")]
    BadCondition(String),

    #[error("bad dice '{0}': {1}")]
    BadDice(String, String),
}

/// Initiative given as a literal or as dice to roll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiativeInput {
    Value(i32),
    Roll(DiceRoll),
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Add {
        faction: Faction,
        name: String,
        initiative: InitiativeInput,
        dexterity: i32,
        max_hp: i32,
    },
    Reroll {
        target: Target,
        initiative: InitiativeInput,
    },
    Run(Command),
    Save,
    Load,
    Export,
    List,
    Log,
    Json,
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(token: &str) -> Result<T, ParseError> {
    token
        .trim_start_matches('+')
        .parse()
        .map_err(|_| ParseError::BadNumber(token.to_string()))
}

fn target(token: Option<&str>) -> Result<Target, ParseError> {
    match token {
        None => Ok(Target::Selected),
        Some(t) => number(t.trim_start_matches('#')).map(|id| Target::Id(CombatantId(id))),
    }
}

fn condition(token: &str) -> Result<Condition, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::BadCondition(token.to_string()))
}

fn initiative(token: &str) -> Result<InitiativeInput, ParseError> {
    if let Ok(value) = token.trim_start_matches('+').parse() {
        return Ok(InitiativeInput::Value(value));
    }
    parse_dice(token)
        .map(InitiativeInput::Roll)
        .map_err(|e| ParseError::BadDice(token.to_string(), e))
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Input>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&word, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let input = match (word.to_lowercase().as_str(), args) {
        ("add", [faction, name @ .., init, dex, hp]) if !name.is_empty() => Input::Add {
            faction: Faction::from_str(faction)
                .ok_or_else(|| ParseError::BadFaction(faction.to_string()))?,
            name: name.join(" "),
            initiative: initiative(init)?,
            dexterity: number(dex)?,
            max_hp: number(hp)?,
        },
        ("add", _) => return Err(ParseError::Usage("add <p|e> <name> <init|dice> <dex> <hp>")),

        ("rm", [] | [_]) => Input::Run(Command::Remove {
            target: target(args.first().copied())?,
        }),
        ("dup", [count] | [count, _]) => Input::Run(Command::Duplicate {
            target: target(args.get(1).copied())?,
            count: number(count)?,
        }),
        ("dup", _) => return Err(ParseError::Usage("dup <count> [id]")),

        ("hp", [delta, rest @ ..]) if rest.len() <= 2 => {
            let critical = rest.iter().any(|t| t.eq_ignore_ascii_case("crit"));
            let id = rest.iter().copied().find(|t| !t.eq_ignore_ascii_case("crit"));
            Input::Run(Command::ChangeHp {
                target: target(id)?,
                delta: number(delta)?,
                critical,
            })
        }
        ("hp", _) => return Err(ParseError::Usage("hp <+heal|-dmg> [id] [crit]")),

        ("init", [value] | [value, _]) => Input::Reroll {
            target: target(args.get(1).copied())?,
            initiative: initiative(value)?,
        },
        ("init", _) => return Err(ParseError::Usage("init <value|dice> [id]")),

        ("cond", [name] | [name, _]) => Input::Run(Command::ToggleCondition {
            target: target(args.get(1).copied())?,
            condition: condition(name)?,
        }),
        ("cond", _) => return Err(ParseError::Usage("cond <condition> [id]")),

        ("dur", [name, rounds] | [name, rounds, _]) => Input::Run(Command::SetConditionDuration {
            target: target(args.get(2).copied())?,
            condition: condition(name)?,
            rounds: number(rounds)?,
        }),
        ("dur", _) => return Err(ParseError::Usage("dur <condition> <rounds> [id]")),

        ("sel", [id]) => match target(Some(*id))? {
            Target::Id(id) => Input::Run(Command::Select(id)),
            Target::Selected => return Err(ParseError::Usage("sel <id>")),
        },
        ("sel", _) => return Err(ParseError::Usage("sel <id>")),

        ("death", [] | [_]) => Input::Run(Command::RollDeathSave {
            target: target(args.first().copied())?,
        }),
        ("stab", [] | [_]) => Input::Run(Command::Stabilize {
            target: target(args.first().copied())?,
        }),

        ("next", []) => Input::Run(Command::NextTurn),
        ("prev", []) => Input::Run(Command::PreviousTurn),
        ("up", []) => Input::Run(Command::MoveSelection(-1)),
        ("down", []) => Input::Run(Command::MoveSelection(1)),
        ("undo", []) => Input::Run(Command::Undo),
        ("save", []) => Input::Save,
        ("load", []) => Input::Load,
        ("export", []) => Input::Export,
        ("list", []) => Input::List,
        ("log", []) => Input::Log,
        ("json", []) => Input::Json,
        ("help" | "?", _) => Input::Help,
        ("quit" | "exit" | "q", []) => Input::Quit,

        (
            "rm" | "death" | "stab" | "next" | "prev" | "up" | "down" | "undo" | "save" | "load"
            | "export" | "list" | "log" | "json" | "quit" | "exit" | "q",
            _,
        ) => return Err(ParseError::Usage("too many arguments")),
        (other, _) => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(input))
}

/// One line of the `list` view
pub fn render_combatant(combatant: &Combatant, current: bool, selected: bool) -> String {
    let mut line = format!(
        "{}{} {:>4} {:<31} {} init {:>3} dex {:>3} hp {:>4}/{:<4} {:?}",
        if current { '>' } else { ' ' },
        if selected { '*' } else { ' ' },
        combatant.id,
        combatant.name,
        if combatant.is_player() { 'P' } else { 'E' },
        combatant.initiative,
        combatant.dexterity,
        combatant.hp,
        combatant.max_hp,
        combatant.hp_band(),
    );

    if combatant.is_player() && combatant.hp <= 0 && !combatant.is_dead {
        let saves = combatant.death_saves;
        line.push_str(&format!(" saves {}/{}", saves.successes, saves.failures));
        if combatant.is_stable {
            line.push_str(" stable");
        }
    }

    for condition in combatant.conditions.active().iter() {
        match combatant.conditions.duration(condition) {
            0 => line.push_str(&format!(" {}", condition)),
            n => line.push_str(&format!(" {}({})", condition, n)),
        }
    }
    line
}

/// Interactive loop over a session
pub struct Repl<R, W> {
    session: Session,
    store: FileStore,
    export: FileStore,
    assume_yes: bool,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(session: Session, store: FileStore, export: FileStore, input: R, output: W) -> Self {
        Self {
            session,
            store,
            export,
            assume_yes: false,
            input,
            output,
        }
    }

    /// Skip y/n confirmations
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn into_parts(self) -> (Session, W) {
        (self.session, self.output)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        write!(self.output, "{} (y/n) ", question)?;
        self.output.flush()?;
        Ok(self
            .read_line()?
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y")))
    }

    /// Run until `quit` or end of input
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            write!(self.output, "R{}> ", self.session.round())?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                break;
            };

            match parse_line(&line) {
                Ok(None) => {}
                Ok(Some(Input::Quit)) => break,
                Ok(Some(input)) => self.handle(input)?,
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
        Ok(())
    }

    /// Handle one parsed input
    pub fn handle(&mut self, input: Input) -> io::Result<()> {
        match input {
            Input::Add {
                faction,
                name,
                initiative,
                dexterity,
                max_hp,
            } => {
                let initiative = self.resolve_initiative(initiative);
                self.run_command(Command::Add {
                    faction,
                    name,
                    initiative,
                    dexterity,
                    max_hp,
                })
            }
            Input::Reroll { target, initiative } => {
                let value = self.resolve_initiative(initiative);
                self.run_command(Command::RerollInitiative { target, value })
            }
            Input::Run(Command::Remove { target }) => {
                let name = match target {
                    Target::Id(id) => self.session.get(id),
                    Target::Selected => self.session.selected().and_then(|id| self.session.get(id)),
                }
                .map(|c| c.name.clone());
                match name {
                    Some(name) if !self.confirm(&format!("Remove {}?", name))? => {
                        writeln!(self.output, "cancelled")
                    }
                    _ => self.run_command(Command::Remove { target }),
                }
            }
            Input::Run(command) => self.run_command(command),
            Input::Save => match self.session.save(&self.store) {
                Ok(()) => writeln!(self.output, "saved to {}", self.store.path().display()),
                Err(e) => writeln!(self.output, "save failed: {}", e),
            },
            Input::Load => self.load(),
            Input::Export => self.export(),
            Input::List => self.list(),
            Input::Log => {
                for entry in self.session.log_entries() {
                    writeln!(self.output, "{}", entry)?;
                }
                Ok(())
            }
            Input::Json => {
                let dump = serde_json::json!({
                    "round": self.session.round(),
                    "current": self.session.current_turn(),
                    "selected": self.session.selected(),
                    "combatants": self.session.combatants(),
                    "log": self.session.log_entries(),
                });
                match serde_json::to_string_pretty(&dump) {
                    Ok(text) => writeln!(self.output, "{}", text),
                    Err(e) => writeln!(self.output, "json failed: {}", e),
                }
            }
            Input::Help => writeln!(self.output, "{}", HELP),
            Input::Quit => Ok(()),
        }
    }

    fn resolve_initiative(&mut self, initiative: InitiativeInput) -> i32 {
        match initiative {
            InitiativeInput::Value(value) => value,
            InitiativeInput::Roll(dice) => self.session.roll(&dice),
        }
    }

    fn run_command(&mut self, command: Command) -> io::Result<()> {
        let before = self.session.log_entries().len();
        match self.session.execute(command) {
            Ok(outcome) => {
                for entry in &self.session.log_entries()[before..] {
                    writeln!(self.output, "{}", entry.message)?;
                }
                self.report(&outcome)
            }
            Err(e) => writeln!(self.output, "error: {}", e),
        }
    }

    // Outcomes that don't narrate into the log
    fn report(&mut self, outcome: &Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Selected(id) => {
                let name = self.session.get(*id).map(|c| c.name.as_str()).unwrap_or("?");
                writeln!(self.output, "selected {} {}", id, name)
            }
            Outcome::HpChanged { change, .. }
                if change.effect == HpEffect::None && change.old_hp == change.new_hp =>
            {
                writeln!(self.output, "no change")
            }
            _ => Ok(()),
        }
    }

    fn load(&mut self) -> io::Result<()> {
        if !self.session.combatants().is_empty()
            && !self.confirm("Loading replaces the current encounter. Continue?")?
        {
            return writeln!(self.output, "cancelled");
        }
        match self.session.load(&self.store) {
            Ok(report) => {
                for warning in &report.warnings {
                    writeln!(self.output, "skipped {}", warning)?;
                }
                writeln!(
                    self.output,
                    "loaded {} combatants, round {}",
                    report.loaded,
                    self.session.round()
                )
            }
            Err(e) => writeln!(self.output, "load failed: {}", e),
        }
    }

    fn export(&mut self) -> io::Result<()> {
        if self.session.log_entries().is_empty() {
            return writeln!(self.output, "log is empty");
        }
        let result = match self.export.append() {
            Ok(mut out) => self.session.export_log(&mut out),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(count) => writeln!(
                self.output,
                "exported {} entries to {}",
                count,
                self.export.path().display()
            ),
            Err(e) => writeln!(self.output, "export failed: {}", e),
        }
    }

    fn list(&mut self) -> io::Result<()> {
        writeln!(self.output, "Round {}", self.session.round())?;
        let current = self.session.current_turn();
        let selected = self.session.selected();
        for combatant in self.session.combatants() {
            let line = render_combatant(
                combatant,
                current == Some(combatant.id),
                selected == Some(combatant.id),
            );
            writeln!(self.output, "{}", line)?;
        }
        Ok(())
    }
}
