//! Server → Client messages

use serde::{Deserialize, Serialize};

use crate::types::{CpuStats, MemoryStats, OutputKind};

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Textual result of a command, targeted at the originating tab
    Output {
        tab_id: String,
        output: String,
        kind: OutputKind,
    },

    /// The tab's working directory changed; distinct from the textual
    /// output so the client can update its prompt state.
    DirectoryChange { tab_id: String, directory: String },

    /// Ordered suggestions for a partial command
    AutocompleteSuggestions {
        tab_id: String,
        suggestions: Vec<String>,
    },

    /// The tab's command history, oldest first
    History {
        tab_id: String,
        history: Vec<String>,
    },

    /// Periodic host metrics; broadcast to every connection, no tab id
    SystemInfo {
        cpu: CpuStats,
        memory: MemoryStats,
        process_count: u64,
    },

    /// Acknowledges tab creation (explicit `new_tab` or first contact)
    TabOpened { tab_id: String, directory: String },

    /// Transport-level problem (parse failure, unknown tab, ...)
    Error {
        code: String,
        message: String,
        tab_id: Option<String>,
    },
}
