//! Global transcript log.
//!
//! Cross-tab record of command/output pairs backing `/api/export-logs`.
//! In-memory and capped; sessions write to it through the dispatcher.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Local;
use webterm_protocol::{OutputKind, TranscriptEntry};

pub struct TranscriptLog {
    entries: Mutex<VecDeque<TranscriptEntry>>,
    limit: usize,
}

impl TranscriptLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    pub fn record(&self, tab_id: &str, command: &str, output: &str, kind: OutputKind) {
        if self.limit == 0 {
            return;
        }
        let entry = TranscriptEntry {
            tab_id: tab_id.to_string(),
            command: command.to_string(),
            output: output.to_string(),
            kind,
            timestamp: now_stamp(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.limit {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All entries, oldest first.
    pub fn all(&self) -> Vec<TranscriptEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    /// Entries for one tab, oldest first.
    pub fn for_tab(&self, tab_id: &str) -> Vec<TranscriptEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.tab_id == tab_id)
            .cloned()
            .collect()
    }
}

pub fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
