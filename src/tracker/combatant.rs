//! Combatant records

use serde::{Deserialize, Serialize};

use super::condition::{Condition, Conditions};

/// Maximum characters kept in a combatant name
pub const NAME_LENGTH: usize = 31;

/// Session-unique combatant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub i32);

impl std::fmt::Display for CombatantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side of the table a combatant is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
}

impl Faction {
    /// Persisted code (0 = Player, 1 = Enemy)
    pub fn code(self) -> u8 {
        match self {
            Faction::Player => 0,
            Faction::Enemy => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Faction> {
        match code {
            0 => Some(Faction::Player),
            1 => Some(Faction::Enemy),
            _ => None,
        }
    }

    /// Parse from a user-typed word
    pub fn from_str(s: &str) -> Option<Faction> {
        match s.trim().to_lowercase().as_str() {
            "p" | "player" | "pc" => Some(Faction::Player),
            "e" | "enemy" | "npc" | "monster" => Some(Faction::Enemy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Faction::Player => write!(f, "Player"),
            Faction::Enemy => write!(f, "Enemy"),
        }
    }
}

/// Death-save progress of a downed Player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: u8,
    pub failures: u8,
}

impl DeathSaves {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Coarse health classification for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpBand {
    Healthy,
    /// At or below half
    Hurt,
    /// At or below a quarter
    Critical,
    /// At 0 HP and not dead
    Down,
    Dead,
}

/// One tracked participant in the encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    pub initiative: i32,
    pub dexterity: i32,
    pub max_hp: i32,
    pub hp: i32,
    pub conditions: Conditions,
    pub death_saves: DeathSaves,
    pub is_stable: bool,
    pub is_dead: bool,
}

impl Combatant {
    /// Create a combatant at full HP with no conditions
    pub fn new(
        id: CombatantId,
        name: impl Into<String>,
        faction: Faction,
        initiative: i32,
        dexterity: i32,
        max_hp: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            initiative,
            dexterity,
            max_hp,
            hp: max_hp,
            conditions: Conditions::new(),
            death_saves: DeathSaves::default(),
            is_stable: false,
            is_dead: false,
        }
    }

    pub fn is_player(&self) -> bool {
        self.faction == Faction::Player
    }

    /// A Player at 0 HP who is neither stable nor dead
    pub fn is_dying(&self) -> bool {
        self.is_player() && self.hp <= 0 && !self.is_stable && !self.is_dead
    }

    pub fn has(&self, condition: Condition) -> bool {
        self.conditions.has(condition)
    }

    pub fn hp_band(&self) -> HpBand {
        if self.is_dead || (self.hp <= 0 && !self.is_player()) {
            HpBand::Dead
        } else if self.hp <= 0 {
            HpBand::Down
        } else if self.hp <= self.max_hp / 4 {
            HpBand::Critical
        } else if self.hp <= self.max_hp / 2 {
            HpBand::Hurt
        } else {
            HpBand::Healthy
        }
    }

    /// Fresh copy of this combatant as a new arrival: full HP, no conditions,
    /// no death-save progress
    pub fn arrival(&self, id: CombatantId, name: String, initiative: i32) -> Self {
        Self::new(id, name, self.faction, initiative, self.dexterity, self.max_hp)
    }
}

/// Trim surrounding whitespace and truncate to [`NAME_LENGTH`] characters
pub fn normalize_name(name: &str) -> String {
    name.trim().chars().take(NAME_LENGTH).collect::<String>().trim_end().to_string()
}
