//! Turn order scenario tests
//!
//! Tests sorting, round cycling, condition decay and duplication

use crate::harness::TestTable;
use initrack::session::{Command, Outcome, Target};
use initrack::tracker::Condition;

#[test]
fn test_ties_break_on_dex_then_id() {
    let mut table = TestTable::new([]);
    table.enemy("Orc A", 10, 2, 15);
    table.enemy("Orc B", 10, 2, 15);
    table.player("Bram", 10, 3, 25);
    table.player("Cyra", 12, 0, 18);

    assert_eq!(table.order(), vec!["Cyra", "Bram", "Orc A", "Orc B"]);
    table.assert_invariants();
}

#[test]
fn test_full_cycle_returns_to_holder() {
    let mut table = TestTable::new([]);
    table.player("Aria", 15, 2, 20);
    table.player("Bram", 12, 1, 25);
    table.enemy("Goblin", 10, 1, 7);
    table.enemy("Wolf", 8, 3, 11);

    table.next();
    let holder = table.session.current_turn();
    let round = table.session.round();

    for _ in 0..4 {
        table.next();
        table.assert_invariants();
    }

    assert_eq!(table.session.current_turn(), holder);
    assert_eq!(table.session.round(), round + 1);
    assert_eq!(table.session.selected(), holder);
}

#[test]
fn test_round_banner_comes_after_expiries() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);
    table.enemy("Goblin", 10, 1, 7);
    table.condition(aria, Condition::Prone, 1);

    table.next();
    match table.next() {
        Outcome::TurnChanged { step, expired, .. } => {
            assert!(step.wrapped);
            assert_eq!(expired, vec![(aria, Condition::Prone)]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let messages = table.messages();
    let tail = &messages[messages.len() - 3..];
    assert_eq!(
        tail,
        [
            "Aria: Prone duration ended.",
            "--- START OF ROUND 2 ---",
            "Aria's turn."
        ]
    );
}

#[test]
fn test_condition_decay() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);
    let goblin = table.enemy("Goblin", 10, 1, 7);
    table.condition(aria, Condition::Frightened, 3);
    table.condition(goblin, Condition::Poisoned, 0);

    // Two combatants: every second advance wraps the round
    for wrap in 1..=2 {
        table.next();
        table.next();
        assert_eq!(table.session.round(), wrap + 1);
        assert!(table.get(aria).has(Condition::Frightened));
        assert_eq!(table.get(aria).conditions.duration(Condition::Frightened), 3 - wrap);
    }

    table.next();
    table.next();
    assert!(!table.get(aria).has(Condition::Frightened));
    assert_eq!(table.get(aria).conditions.duration(Condition::Frightened), 0);

    for _ in 0..10 {
        table.next();
    }
    assert!(table.get(goblin).has(Condition::Poisoned));
    table.assert_invariants();
}

#[test]
fn test_reverting_past_round_start() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);
    let goblin = table.enemy("Goblin", 10, 1, 7);

    // Round 1 never goes below 1
    table.prev();
    assert_eq!(table.session.current_turn(), Some(goblin));
    assert_eq!(table.session.round(), 1);

    table.next();
    assert_eq!(table.session.round(), 2);
    assert_eq!(table.session.current_turn(), Some(aria));

    table.prev();
    assert_eq!(table.session.round(), 1);
    assert_eq!(table.session.current_turn(), Some(goblin));
    let messages = table.messages();
    assert_eq!(
        &messages[messages.len() - 2..],
        ["--- END OF ROUND 1 (Revert) ---", "Turn reverted to Goblin."]
    );
}

#[test]
fn test_removing_turn_holder_passes_turn() {
    let mut table = TestTable::new([]);
    table.player("Aria", 15, 2, 20);
    let bram = table.player("Bram", 12, 1, 25);
    let goblin = table.enemy("Goblin", 10, 1, 7);

    table.next();
    assert_eq!(table.session.current_turn(), Some(bram));

    table.run(Command::Remove {
        target: Target::Id(bram),
    });
    assert_eq!(table.session.current_turn(), Some(goblin));
    table.assert_invariants();

    // Removing the last entry wraps the turn to the top
    table.run(Command::Remove {
        target: Target::Id(goblin),
    });
    assert_eq!(table.order(), vec!["Aria"]);
    assert_eq!(table.session.current_turn(), table.session.combatants().first().map(|c| c.id));
}

#[test]
fn test_duplicate_numbers_copies() {
    let mut table = TestTable::new([5, 12]);
    let goblin = table.enemy("Goblin", 10, 1, 7);

    let outcome = table.run(Command::Duplicate {
        target: Target::Id(goblin),
        count: 2,
    });
    match outcome {
        Outcome::Duplicated(dup) => {
            assert_eq!(dup.renamed_template.as_deref(), Some("Goblin 1"));
            let names: Vec<_> = dup.copies.iter().map(|(_, n, i)| (n.as_str(), *i)).collect();
            assert_eq!(names, vec![("Goblin 2", 6), ("Goblin 3", 13)]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert_eq!(table.order(), vec!["Goblin 3", "Goblin 1", "Goblin 2"]);
    for copy in table.session.combatants() {
        assert_eq!(copy.hp, 7);
        assert!(copy.conditions.active().is_empty());
    }
    table.assert_invariants();
}

#[test]
fn test_duplicate_fills_gaps() {
    let mut table = TestTable::new([]);
    let first = table.enemy("Skeleton 1", 10, 0, 13);
    table.enemy("Skeleton 3", 9, 0, 13);

    let outcome = table.run(Command::Duplicate {
        target: Target::Id(first),
        count: 2,
    });
    match outcome {
        Outcome::Duplicated(dup) => {
            assert_eq!(dup.renamed_template, None);
            let names: Vec<_> = dup.copies.iter().map(|(_, n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["Skeleton 2", "Skeleton 4"]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_selection_wraps() {
    let mut table = TestTable::new([]);
    let aria = table.player("Aria", 15, 2, 20);
    let goblin = table.enemy("Goblin", 10, 1, 7);

    assert_eq!(table.session.selected(), Some(goblin));
    table.run(Command::MoveSelection(1));
    assert_eq!(table.session.selected(), Some(aria));
    table.run(Command::MoveSelection(-1));
    assert_eq!(table.session.selected(), Some(goblin));

    table.run(Command::Select(aria));
    assert_eq!(table.session.selected(), Some(aria));
    assert_eq!(table.session.current_turn(), Some(aria));
}
