//! initrack - initiative and combat status tracker
//!
//! State engine for running tabletop encounters: turn order, hit points,
//! death saves, timed conditions, undo, a narrated action log and a plain-text
//! save format.

pub mod config;
pub mod error;
pub mod persist;
pub mod repl;
pub mod session;
pub mod tracker;

pub use config::Config;
pub use error::{CommandError, PersistError};
pub use persist::{FileStore, LineStore, MemoryStore};
pub use session::{Command, Limits, LoadReport, Outcome, Session, Target};
