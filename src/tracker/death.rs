//! Hit points and death saves
//!
//! A downed Player moves through a small state machine:
//!
//! ```text
//! Active (hp > 0) --lethal damage--> Dying --3 successes / stabilize--> Stable
//!        ^                             |  \--3 failures / overkill----> Dead
//!        +------natural 20 / healing---+
//! ```
//!
//! Damage taken while Stable sends the Player back to Dying. Enemies never
//! make death saves; they are simply defeated at 0 HP.

use super::combatant::Combatant;
use super::condition::Condition;
use crate::error::CommandError;

/// Successes or failures needed to settle a death save
pub const DEATH_SAVE_LIMIT: u8 = 3;

/// What an HP change did beyond moving the number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpEffect {
    /// Nothing beyond the HP change
    None,
    /// A Player dropped to 0 HP and fell unconscious
    Downed,
    /// A single hit overflowed max HP and killed a Player outright
    InstantDeath,
    /// A Player already at 0 HP took damage and failed death saves
    DamagedWhileDown {
        failures: u8,
        was_stable: bool,
        died: bool,
    },
    /// An Enemy dropped to 0 HP
    Defeated,
    /// A Player at 0 HP was healed back up
    Revived { was_dead: bool },
}

/// Result of [`apply_hp_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpChange {
    pub old_hp: i32,
    pub new_hp: i32,
    pub effect: HpEffect,
}

/// Result of a single death save roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathSave {
    /// Natural 20: back on their feet at 1 HP
    Recovered,
    Success { successes: u8, stable: bool },
    Failure { failures: u8, added: u8, dead: bool },
}

fn clamp_hp(hp: i64, max_hp: i32) -> i32 {
    hp.clamp(0, max_hp.max(0) as i64) as i32
}

/// Add death-save failures, marking the combatant dead at the limit
///
/// Returns whether the combatant is now dead.
pub fn record_failure(combatant: &mut Combatant, count: u8) -> bool {
    let saves = &mut combatant.death_saves;
    saves.failures = saves.failures.saturating_add(count).min(DEATH_SAVE_LIMIT);
    if saves.failures >= DEATH_SAVE_LIMIT {
        combatant.is_dead = true;
        combatant.is_stable = false;
    }
    combatant.is_dead
}

/// Apply damage (negative delta) or healing (positive delta)
///
/// HP always ends in `[0, max_hp]`. For Players this also drives the
/// Unconscious condition and the death-save counters. `critical` marks a
/// critical hit landed from close range against a downed Player, which
/// counts as two failures.
pub fn apply_hp_change(combatant: &mut Combatant, delta: i32, critical: bool) -> HpChange {
    let old_hp = combatant.hp;
    let mut effect = HpEffect::None;

    if delta < 0 {
        let damage = -(delta as i64);
        if combatant.is_player() && !combatant.is_dead {
            if old_hp > 0 && damage - old_hp as i64 >= combatant.max_hp as i64 {
                combatant.hp = 0;
                combatant.is_dead = true;
                combatant.is_stable = false;
                combatant.conditions.apply(Condition::Unconscious);
                combatant.death_saves.reset();
                return HpChange {
                    old_hp,
                    new_hp: 0,
                    effect: HpEffect::InstantDeath,
                };
            }
            if old_hp <= 0 {
                let was_stable = combatant.is_stable;
                if was_stable {
                    combatant.is_stable = false;
                    combatant.death_saves.reset();
                }
                let died = record_failure(combatant, if critical { 2 } else { 1 });
                effect = HpEffect::DamagedWhileDown {
                    failures: combatant.death_saves.failures,
                    was_stable,
                    died,
                };
            }
        }

        combatant.hp = clamp_hp(old_hp as i64 - damage, combatant.max_hp);

        if old_hp > 0 && combatant.hp == 0 {
            if combatant.is_player() {
                combatant.conditions.apply(Condition::Unconscious);
                combatant.death_saves.reset();
                effect = HpEffect::Downed;
            } else {
                effect = HpEffect::Defeated;
            }
        }
    } else if delta > 0 {
        combatant.hp = clamp_hp(old_hp as i64 + delta as i64, combatant.max_hp);

        if combatant.is_player() && old_hp <= 0 && combatant.hp > 0 {
            let was_dead = combatant.is_dead;
            combatant.conditions.clear(Condition::Unconscious);
            combatant.death_saves.reset();
            combatant.is_dead = false;
            combatant.is_stable = false;
            effect = HpEffect::Revived { was_dead };
        }
    } else {
        combatant.hp = clamp_hp(old_hp as i64, combatant.max_hp);
    }

    HpChange {
        old_hp,
        new_hp: combatant.hp,
        effect,
    }
}

/// Resolve one death save with a d20 result already rolled
pub fn roll_death_save(combatant: &mut Combatant, roll: u32) -> Result<DeathSave, CommandError> {
    if !combatant.is_dying() {
        return Err(CommandError::NotDying(combatant.name.clone()));
    }

    let outcome = match roll {
        20 => {
            combatant.hp = 1.min(combatant.max_hp.max(1));
            combatant.conditions.clear(Condition::Unconscious);
            combatant.death_saves.reset();
            DeathSave::Recovered
        }
        10..=19 => {
            let saves = &mut combatant.death_saves;
            saves.successes = (saves.successes + 1).min(DEATH_SAVE_LIMIT);
            let stable = saves.successes >= DEATH_SAVE_LIMIT;
            if stable {
                combatant.is_stable = true;
            }
            DeathSave::Success {
                successes: combatant.death_saves.successes,
                stable,
            }
        }
        _ => {
            let added = if roll <= 1 { 2 } else { 1 };
            let dead = record_failure(combatant, added);
            DeathSave::Failure {
                failures: combatant.death_saves.failures,
                added,
                dead,
            }
        }
    };

    Ok(outcome)
}

/// Stabilize a dying Player without rolling (e.g. a Medicine check)
pub fn stabilize(combatant: &mut Combatant) -> Result<(), CommandError> {
    if !combatant.is_dying() {
        return Err(CommandError::NotDying(combatant.name.clone()));
    }
    combatant.death_saves.reset();
    combatant.is_stable = true;
    Ok(())
}
