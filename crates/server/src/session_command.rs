//! Commands sent to a session actor.
//!
//! Processed strictly in order by the actor loop; this queue is what
//! serializes a tab's command executions against its working directory.

use std::path::PathBuf;

use tokio::sync::oneshot;

pub enum SessionCommand {
    /// Resolve and execute one raw input line; resulting events are
    /// delivered to the owning connection through the hub.
    Execute { raw: String },

    /// Compute autocomplete suggestions for a partial input against the
    /// vocabulary and the tab's current directory.
    Autocomplete { partial: String },

    /// Send the tab's history (oldest first) to the owning connection.
    History,

    /// Announce the tab to its owner (`tab_opened` with the current
    /// directory).
    Announce,

    /// Read the current working directory (tests and diagnostics).
    CurrentDir { reply: oneshot::Sender<PathBuf> },

    /// Stop the actor; the session record is gone once this is processed.
    Shutdown,
}
