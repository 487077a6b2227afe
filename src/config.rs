//! Configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `INITRACK_*` environment variables. Command-line flags are applied on top
//! by the binary.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::session::Limits;
use crate::tracker::{MAX_COMBATANTS, MAX_UNDO_STACK};

/// Default snapshot file name, placed in the home directory
pub const SAVE_FILE_NAME: &str = ".dnd_tracker_save.txt";
/// Default log export file name, placed in the home directory
pub const LOG_EXPORT_FILE_NAME: &str = "combat_log_export.txt";
/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "initrack.toml";

const MAX_UNDO_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where `save`/`load` read and write the encounter
    pub save_file: PathBuf,
    /// Where `export` appends the action log
    pub log_export_file: PathBuf,
    /// Registry capacity (1..=50)
    pub max_combatants: usize,
    /// Undo snapshots kept (1..=64)
    pub undo_depth: usize,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Emit diagnostics as JSON lines instead of plain text
    pub log_json: bool,
}

fn home_file(name: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Path::new(&home).join(name),
        _ => PathBuf::from(name),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_file: home_file(SAVE_FILE_NAME),
            log_export_file: home_file(LOG_EXPORT_FILE_NAME),
            max_combatants: MAX_COMBATANTS,
            undo_depth: MAX_UNDO_STACK,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build the provider chain: defaults, TOML file, environment
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("INITRACK_"))
    }

    /// Load configuration; a missing TOML file is not an error
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    /// Engine limits, clamped to what the engine supports
    pub fn limits(&self) -> Limits {
        Limits {
            max_combatants: self.max_combatants.clamp(1, MAX_COMBATANTS),
            undo_depth: self.undo_depth.clamp(1, MAX_UNDO_DEPTH),
        }
    }
}
