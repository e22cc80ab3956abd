//! Client → Server messages

use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Execute a command in the context of a tab
    Command { command: String, tab_id: String },

    /// Request autocomplete suggestions for a partial command
    Autocomplete { command: String, tab_id: String },

    /// Request the command history of a tab
    GetHistory { tab_id: String },

    /// Explicitly open a tab. An empty `tab_id` asks the server to
    /// generate one; the id is echoed back in `tab_opened`.
    NewTab {
        #[serde(default)]
        tab_id: String,
    },

    /// Explicitly close a tab and discard its session state
    CloseTab { tab_id: String },
}
