//! The closed command registry.
//!
//! Maps command names to tagged handler variants, enumerated at startup.
//! Names not present here are either answered with a "did you mean"
//! suggestion (close misspelling) or routed to the generic process
//! primitive by the dispatcher.

use std::collections::HashMap;

/// Filesystem operation handled by the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOp {
    List,
    ChangeDir,
    PrintWorkingDir,
    MakeDir,
    RemoveDir,
    Remove,
    Copy,
    Move,
    ReadFile,
    Touch,
}

/// System-information command answered from the latest metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsQuery {
    Cpu,
    Memory,
    Processes,
}

/// Commands implemented directly by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Echo,
    Clear,
    Exit,
}

/// Tagged handler for a registered command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Navigator(NavOp),
    Metrics(MetricsQuery),
    Builtin(Builtin),
    Help,
    History,
    /// Known vocabulary word explicitly routed to host process execution
    External,
}

pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Handler,
    /// Whether autocomplete should offer directory entries for arguments
    pub takes_paths: bool,
}

pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
    by_name: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let commands = command_table();
        let by_name = commands
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.name, idx))
            .collect();
        Self { commands, by_name }
    }

    /// Look up a command; names are matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        let lowered = name.to_lowercase();
        self.by_name.get(lowered.as_str()).map(|&idx| &self.commands[idx])
    }

    /// All registered command names, alphabetical.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.iter().map(|c| c.name.to_string()).collect();
        names.sort();
        names
    }

    /// Command names starting with `prefix`, alphabetical.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut names: Vec<String> = self
            .commands
            .iter()
            .filter(|c| c.name.starts_with(&prefix))
            .map(|c| c.name.to_string())
            .collect();
        names.sort();
        names
    }

    /// The static help catalogue.
    pub fn catalogue(&self) -> String {
        let mut lines = vec!["Available commands:".to_string()];
        let mut sorted: Vec<&CommandSpec> = self.commands.iter().collect();
        sorted.sort_by_key(|c| c.name);
        for spec in sorted {
            lines.push(format!("  {:<10} - {}", spec.name, spec.description));
        }
        lines.join("\n")
    }

    /// One-line help for a single command.
    pub fn describe(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|spec| format!("{} - {}", spec.name, spec.description))
    }

    /// Vocabulary entries within close edit distance of `name`, ranked
    /// best first. Used for "did you mean" on unknown commands.
    pub fn suggest_similar(&self, name: &str) -> Vec<String> {
        let probe = name.to_lowercase();
        let mut scored: Vec<(f64, &'static str)> = self
            .commands
            .iter()
            .map(|c| (strsim::jaro_winkler(&probe, c.name), c.name))
            .filter(|(score, _)| *score >= 0.84)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        scored.into_iter().take(3).map(|(_, n)| n.to_string()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn command_table() -> Vec<CommandSpec> {
    fn spec(
        name: &'static str,
        description: &'static str,
        handler: Handler,
        takes_paths: bool,
    ) -> CommandSpec {
        CommandSpec {
            name,
            description,
            handler,
            takes_paths,
        }
    }

    vec![
        spec("ls", "List directory contents", Handler::Navigator(NavOp::List), true),
        spec("cd", "Change directory", Handler::Navigator(NavOp::ChangeDir), true),
        spec("pwd", "Print working directory", Handler::Navigator(NavOp::PrintWorkingDir), false),
        spec("mkdir", "Make directory", Handler::Navigator(NavOp::MakeDir), true),
        spec("rmdir", "Remove empty directory", Handler::Navigator(NavOp::RemoveDir), true),
        spec("rm", "Remove file or directory", Handler::Navigator(NavOp::Remove), true),
        spec("cp", "Copy file or directory", Handler::Navigator(NavOp::Copy), true),
        spec("mv", "Move file or directory", Handler::Navigator(NavOp::Move), true),
        spec("cat", "Display file contents", Handler::Navigator(NavOp::ReadFile), true),
        spec("touch", "Create an empty file", Handler::Navigator(NavOp::Touch), true),
        spec("echo", "Display a line of text", Handler::Builtin(Builtin::Echo), false),
        spec("clear", "Clear the terminal screen", Handler::Builtin(Builtin::Clear), false),
        spec("exit", "Exit the terminal", Handler::Builtin(Builtin::Exit), false),
        spec("help", "Display help information", Handler::Help, false),
        spec("history", "Show command history", Handler::History, false),
        spec("cpu", "Display CPU usage", Handler::Metrics(MetricsQuery::Cpu), false),
        spec("memory", "Display memory usage", Handler::Metrics(MetricsQuery::Memory), false),
        spec("processes", "Show running process count", Handler::Metrics(MetricsQuery::Processes), false),
        spec("grep", "Search for patterns in files", Handler::External, true),
        spec("find", "Search for files", Handler::External, true),
        spec("ps", "Report process status", Handler::External, false),
        spec("top", "Display system processes", Handler::External, false),
    ]
}
