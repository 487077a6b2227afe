//! Undo scenario tests
//!
//! Tests the bounded history and exact restores

use crate::harness::TestTable;
use initrack::session::{Command, Limits, Target};
use initrack::tracker::Condition;
use initrack::CommandError;

#[test]
fn test_only_last_ten_are_kept() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);

    // Eleven more undoable commands; the add itself is the oldest snapshot
    for _ in 0..11 {
        table.damage(aria, 1);
    }
    assert_eq!(table.session.undo_depth(), 10);

    for _ in 0..10 {
        table.run(Command::Undo);
    }
    // The snapshots from before the add and the first hit are gone
    assert_eq!(table.get(aria).hp, 19);
    assert_eq!(
        table.session.execute(Command::Undo),
        Err(CommandError::NothingToUndo)
    );
}

#[test]
fn test_undo_restores_exact_state() {
    let mut table = TestTable::new([6]);
    let aria = table.player("Aria", 15, 2, 20);
    let goblin = table.enemy("Goblin", 10, 1, 7);
    table.condition(goblin, Condition::Restrained, 2);
    table.damage(aria, 20);
    table.next();

    let snapshot = table.session.snapshot();
    let round = table.session.round();

    // Wrap the round: decays durations and rolls a death save
    table.next();
    assert_eq!(table.session.round(), round + 1);
    assert_eq!(table.get(aria).death_saves.failures, 1);

    table.run(Command::Undo);
    assert_eq!(table.session.snapshot(), snapshot);
    assert_eq!(table.get(goblin).conditions.duration(Condition::Restrained), 2);
    assert_eq!(table.get(aria).death_saves.failures, 0);
}

#[test]
fn test_undo_brings_back_removed() {
    let mut table = TestTable::new([]);
    table.player("Aria", 15, 2, 20);
    let goblin = table.enemy("Goblin", 10, 1, 7);
    let before = table.session.snapshot();

    table.run(Command::Remove {
        target: Target::Id(goblin),
    });
    assert!(table.session.get(goblin).is_none());

    table.run(Command::Undo);
    assert_eq!(table.session.snapshot(), before);

    // The id of a removed combatant is not handed out again
    let wolf = table.enemy("Wolf", 12, 3, 11);
    assert!(wolf > goblin);
    table.assert_invariants();
}

#[test]
fn test_configured_depth() {
    let limits = Limits {
        max_combatants: 50,
        undo_depth: 2,
    };
    let mut table = TestTable::with_limits(limits, []);
    let aria = table.player("Aria", 15, 2, 20);
    for _ in 0..5 {
        table.damage(aria, 1);
    }
    assert_eq!(table.session.undo_depth(), 2);
    table.run(Command::Undo);
    table.run(Command::Undo);
    assert_eq!(table.get(aria).hp, 17);
}

#[test]
fn test_cursor_moves_are_not_recorded() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);
    table.enemy("Goblin", 10, 1, 7);
    let depth = table.session.undo_depth();

    table.run(Command::MoveSelection(1));
    table.run(Command::Select(aria));
    assert_eq!(table.session.undo_depth(), depth);

    // Undo steps back over the last real change, the Goblin's arrival
    table.run(Command::Undo);
    assert_eq!(table.order(), vec!["Aria"]);
}
