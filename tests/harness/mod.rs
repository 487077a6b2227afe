//! Test harness for encounter scenarios
//!
//! Wraps a [`Session`] driven by scripted dice so scenarios read like a
//! facilitator's script.

use initrack::session::{Command, Limits, Outcome, Session, Target};
use initrack::tracker::{Combatant, CombatantId, Condition, Faction, ScriptedRoller};

/// Session with deterministic dice
pub struct TestTable {
    pub session: Session,
}

impl TestTable {
    /// Table whose dice return `rolls` in order, then 10 forever
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self::with_limits(Limits::default(), rolls)
    }

    pub fn with_limits(limits: Limits, rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            session: Session::with_roller(limits, ScriptedRoller::new(rolls, 10)),
        }
    }

    pub fn run(&mut self, command: Command) -> Outcome {
        self.session
            .execute(command)
            .unwrap_or_else(|e| panic!("command failed: {}", e))
    }

    fn add(
        &mut self,
        faction: Faction,
        name: &str,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> CombatantId {
        match self.run(Command::Add {
            faction,
            name: name.to_string(),
            initiative,
            dexterity,
            max_hp,
        }) {
            Outcome::Added(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    pub fn player(
        &mut self,
        name: &str,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> CombatantId {
        self.add(Faction::Player, name, initiative, dexterity, max_hp)
    }

    pub fn enemy(
        &mut self,
        name: &str,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> CombatantId {
        self.add(Faction::Enemy, name, initiative, dexterity, max_hp)
    }

    pub fn damage(&mut self, id: CombatantId, amount: i32) -> Outcome {
        self.run(Command::ChangeHp {
            target: Target::Id(id),
            delta: -amount,
            critical: false,
        })
    }

    pub fn crit(&mut self, id: CombatantId, amount: i32) -> Outcome {
        self.run(Command::ChangeHp {
            target: Target::Id(id),
            delta: -amount,
            critical: true,
        })
    }

    pub fn heal(&mut self, id: CombatantId, amount: i32) -> Outcome {
        self.run(Command::ChangeHp {
            target: Target::Id(id),
            delta: amount,
            critical: false,
        })
    }

    pub fn condition(&mut self, id: CombatantId, condition: Condition, rounds: i32) {
        self.run(Command::ToggleCondition {
            target: Target::Id(id),
            condition,
        });
        if rounds > 0 {
            self.run(Command::SetConditionDuration {
                target: Target::Id(id),
                condition,
                rounds,
            });
        }
    }

    pub fn next(&mut self) -> Outcome {
        self.run(Command::NextTurn)
    }

    pub fn prev(&mut self) -> Outcome {
        self.run(Command::PreviousTurn)
    }

    pub fn get(&self, id: CombatantId) -> &Combatant {
        self.session
            .get(id)
            .unwrap_or_else(|| panic!("combatant {} missing", id))
    }

    /// Names in turn order
    pub fn order(&self) -> Vec<&str> {
        self.session
            .combatants()
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.session
            .log_entries()
            .iter()
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Check the ordering and cursor invariants that must hold after every command
    pub fn assert_invariants(&self) {
        let combatants = self.session.combatants();
        for pair in combatants.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (a.initiative, a.dexterity, -a.id.0) > (b.initiative, b.dexterity, -b.id.0),
                "{} sorted before {}",
                a.name,
                b.name
            );
        }

        let mut ids: Vec<_> = combatants.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), combatants.len(), "duplicate ids");

        for c in combatants {
            assert!(c.hp >= 0 && c.hp <= c.max_hp, "{} hp out of range", c.name);
            assert!(c.death_saves.successes <= 3 && c.death_saves.failures <= 3);
            for condition in Condition::ALL {
                if !c.has(condition) {
                    assert_eq!(c.conditions.duration(condition), 0);
                }
            }
        }

        assert!(self.session.round() >= 1);
        if combatants.is_empty() {
            assert_eq!(self.session.current_turn(), None);
        } else {
            let current = self.session.current_turn().expect("turn holder missing");
            assert!(self.session.get(current).is_some());
        }
    }
}
