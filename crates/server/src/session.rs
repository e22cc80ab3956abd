//! Per-tab session state.
//!
//! Owned exclusively by the session's actor task; all mutation happens
//! through commands processed there, one at a time.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub struct Session {
    tab_id: String,
    current_dir: PathBuf,
    history: VecDeque<String>,
    history_limit: usize,
    dedup: bool,
}

impl Session {
    pub fn new(tab_id: String, root: PathBuf, history_limit: usize, dedup: bool) -> Self {
        Self {
            tab_id,
            current_dir: root,
            history: VecDeque::new(),
            history_limit,
            dedup,
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Called by the dispatcher after a successful navigator result.
    pub fn set_current_dir(&mut self, dir: PathBuf) {
        self.current_dir = dir;
    }

    /// Append a raw command, evicting the oldest entry past the cap.
    /// When dedup is enabled, a command identical to the immediately
    /// preceding entry is skipped.
    pub fn append_history(&mut self, raw: &str) {
        if self.history_limit == 0 {
            return;
        }
        if self.dedup && self.history.back().is_some_and(|last| last == raw) {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(raw.to_string());
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(limit: usize, dedup: bool) -> Session {
        Session::new("tab-1".into(), PathBuf::from("/tmp"), limit, dedup)
    }

    #[test]
    fn history_cap_evicts_oldest_preserving_order() {
        let mut s = session(3, false);
        for cmd in ["a", "b", "c", "d"] {
            s.append_history(cmd);
        }
        assert_eq!(s.history(), vec!["b", "c", "d"]);
    }

    #[test]
    fn dedup_skips_only_consecutive_duplicates() {
        let mut s = session(10, true);
        s.append_history("ls");
        s.append_history("ls");
        s.append_history("pwd");
        s.append_history("ls");
        assert_eq!(s.history(), vec!["ls", "pwd", "ls"]);
    }

    #[test]
    fn dedup_disabled_keeps_repeats() {
        let mut s = session(10, false);
        s.append_history("ls");
        s.append_history("ls");
        assert_eq!(s.history(), vec!["ls", "ls"]);
    }
}
