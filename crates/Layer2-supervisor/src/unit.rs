//! Bot unit definition and state machine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One managed script and its derived runtime state.
///
/// A `BotUnit` is a view, not a record: it is recomputed from the script
/// directory, the process registry and the process table on each query.
/// The `pid` may be stale between reconciliations and every reader must
/// tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotUnit {
    /// Unique identifier (the uploaded file's name)
    pub name: String,

    /// Location of the script on disk
    pub script_path: PathBuf,

    /// Location of its captured output
    pub log_path: PathBuf,

    /// OS process id, present only while presumed running
    pub pid: Option<u32>,
}

/// Possible states of a bot
///
/// `Running -> Absent` only happens through delete. A process that exited
/// on its own is indistinguishable from a deliberately stopped one after
/// reconciliation; there is no crashed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotState {
    /// No script file exists for this name
    Absent,

    /// Script exists but no live process is on record
    Stopped,

    /// A process presumed alive is on record
    Running,
}

impl BotState {
    /// Check if the bot has a live process on record
    pub fn is_running(&self) -> bool {
        matches!(self, BotState::Running)
    }

    /// Check if the script file exists at all
    pub fn is_present(&self) -> bool {
        !matches!(self, BotState::Absent)
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            BotState::Absent => "Absent",
            BotState::Stopped => "Stopped",
            BotState::Running => "Running",
        }
    }

    /// Get a symbol for the state (for CLI listings)
    pub fn symbol(&self) -> &'static str {
        match self {
            BotState::Absent => "⚪",
            BotState::Stopped => "🔴",
            BotState::Running => "🟢",
        }
    }
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
