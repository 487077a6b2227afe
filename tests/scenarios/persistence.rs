//! Persistence scenario tests
//!
//! Tests save/load round trips through real files and older snapshot layouts

use crate::harness::TestTable;
use initrack::persist::MemoryStore;
use initrack::session::Command;
use initrack::tracker::{CombatantId, Condition, Faction};
use initrack::{FileStore, PersistError};

/// Mid-fight encounter with conditions, durations and death-save progress
fn busy_table() -> TestTable {
    let mut table = TestTable::new([3]);
    let aria = table.player("Aria", 15, 2, 20);
    let bram = table.player("Bram", 12, 1, 25);
    let goblin = table.enemy("Goblin", 10, 1, 7);
    table.enemy("Wolf", 12, 3, 11);

    table.condition(goblin, Condition::Poisoned, 3);
    table.condition(goblin, Condition::Prone, 0);
    table.condition(bram, Condition::Exhaustion, 0);
    table.damage(aria, 20);
    for _ in 0..4 {
        table.next();
    }
    table.run(Command::Select(bram));
    table
}

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileStore::new(dir.path().join("encounter.txt"));

    let table = busy_table();
    assert_eq!(table.session.round(), 2);
    let aria = table.session.combatants()[0].id;
    assert_eq!(table.get(aria).death_saves.failures, 1);
    table.session.save(&store).expect("Failed to save");

    let mut restored = TestTable::new([]);
    let report = restored.session.load(&store).expect("Failed to load");
    assert_eq!(report.loaded, 4);
    assert!(report.warnings.is_empty());

    assert_eq!(restored.session.combatants(), table.session.combatants());
    assert_eq!(restored.session.round(), table.session.round());
    assert_eq!(restored.session.current_turn(), table.session.current_turn());
    assert_eq!(restored.session.selected(), table.session.selected());
    assert_eq!(restored.session.undo_depth(), 0);
    assert_eq!(
        restored.messages(),
        vec!["Game loaded from save file. Round set to 2."]
    );
    restored.assert_invariants();

    // New arrivals never reuse a loaded id
    let max_id = restored.session.combatants().iter().map(|c| c.id).max();
    let newcomer = restored.enemy("Bandit", 9, 0, 11);
    assert!(Some(newcomer) > max_id);
}

#[test]
fn test_legacy_snapshot() {
    let lines: Vec<String> = [
        "3|3|2|2|1",
        "1|Aria|0|15|2|20|20|0",
        // Poisoned (bit 6) with two rounds left
        "2|Goblin|1|10|1|7|4|64|0|0|0|0|0|0|2|0|0|0|0|0|0|0|0|0|0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut table = TestTable::new([]);
    let report = table
        .session
        .load(&MemoryStore::new(lines))
        .expect("Failed to load");
    assert_eq!(report.loaded, 2);

    let goblin = table.get(CombatantId(2));
    assert_eq!(goblin.faction, Faction::Enemy);
    assert_eq!(goblin.hp, 4);
    assert!(goblin.has(Condition::Poisoned));
    assert_eq!(goblin.conditions.duration(Condition::Poisoned), 2);
    assert_eq!(goblin.death_saves.failures, 0);

    assert_eq!(table.session.round(), 3);
    assert_eq!(table.session.current_turn(), Some(CombatantId(2)));
    assert_eq!(table.session.selected(), Some(CombatantId(1)));
}

#[test]
fn test_bad_lines_are_skipped() {
    let lines: Vec<String> = [
        "1|5|4|4|4",
        "1|Aria|0|15|2|20|20|0",
        "2|Goblin|7|10|1|7|7|0",
        "3||1|10|1|7|7|0",
        "1|Copycat|1|10|1|7|7|0",
        "4|Wolf|1|12|3|11|99|0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut table = TestTable::new([]);
    let report = table
        .session
        .load(&MemoryStore::new(lines))
        .expect("Failed to load");

    assert_eq!(report.loaded, 2);
    assert_eq!(report.warnings.len(), 3);
    assert_eq!(table.order(), vec!["Aria", "Wolf"]);
    // HP is clamped into range
    assert_eq!(table.get(CombatantId(4)).hp, 11);
    table.assert_invariants();
}

#[test]
fn test_zero_max_hp_is_skipped() {
    let lines: Vec<String> = [
        "1|3|2|1|1",
        "1|Ghost|0|10|0|0|0|8192",
        "2|Aria|0|15|2|20|0|8192",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut table = TestTable::new([20]);
    let report = table
        .session
        .load(&MemoryStore::new(lines))
        .expect("Failed to load");
    assert_eq!(report.loaded, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(table.order(), vec!["Aria"]);

    // A natural 20 brings Aria back within her maximum
    let aria = CombatantId(2);
    table.run(Command::RollDeathSave { target: aria.into() });
    assert_eq!(table.get(aria).hp, 1);
    table.assert_invariants();
}

#[test]
fn test_failed_load_keeps_encounter() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut table = busy_table();
    let before = table.session.snapshot();
    let depth = table.session.undo_depth();

    let missing = FileStore::new(dir.path().join("missing.txt"));
    assert!(matches!(table.session.load(&missing), Err(PersistError::Io(_))));

    let garbage = MemoryStore::new(vec!["round one|two".to_string()]);
    assert!(matches!(
        table.session.load(&garbage),
        Err(PersistError::MalformedHeader(_))
    ));

    assert!(matches!(
        table.session.load(&MemoryStore::new(Vec::new())),
        Err(PersistError::EmptyFile)
    ));

    assert_eq!(table.session.snapshot(), before);
    assert_eq!(table.session.undo_depth(), depth);
}

#[test]
fn test_export_appends() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileStore::new(dir.path().join("log.txt"));
    let mut table = busy_table();

    let logged = table.session.log_entries().len();
    let mut out = store.append().expect("Failed to open export");
    assert_eq!(table.session.export_log(&mut out).expect("Failed to export"), logged);
    drop(out);

    table.next();
    let mut out = store.append().expect("Failed to open export");
    table.session.export_log(&mut out).expect("Failed to export");
    drop(out);

    let text = std::fs::read_to_string(store.path()).expect("Failed to read export");
    assert_eq!(text.matches("--- END OF LOG ---").count(), 2);
    assert!(text.contains("[R2] --- START OF ROUND 2 ---"));
    assert!(table.session.log_entries().is_empty());
}
