//! Command dispatch.
//!
//! The orchestrator: resolves raw input, routes it through the registry
//! to the navigator, the metrics reader, a builtin, or the generic
//! process primitive, updates session history, and produces the output
//! events to send back. Runs inside the owning session's actor, so
//! executions for one tab never interleave.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use webterm_protocol::{OutputKind, ServerMessage};

use crate::metrics::MetricsReader;
use crate::navigator::{Navigator, NavigatorError};
use crate::registry::{Builtin, CommandRegistry, Handler, MetricsQuery, NavOp};
use crate::resolver::{ResolveError, Resolution, ResolvedCommand, Resolver};
use crate::session::Session;
use crate::shell::{self, ExecOutcome};
use crate::transcript::TranscriptLog;

/// Programs never handed to the process primitive
const BLOCKED_PROGRAMS: &[&str] = &["dd", "mkfs", "format", "shutdown", "reboot"];

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Navigator(#[from] NavigatorError),
    #[error("Command '{name}' not found. Did you mean: {}?", .suggestions.join(", "))]
    UnknownCommand {
        name: String,
        suggestions: Vec<String>,
    },
    #[error("Command '{name}' not found or could not be executed: {reason}")]
    ExecutionFailed { name: String, reason: String },
    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
    #[error("Potentially dangerous command '{name}' blocked")]
    Blocked { name: String },
}

struct CommandOutput {
    output: String,
    new_dir: Option<PathBuf>,
}

impl CommandOutput {
    fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            new_dir: None,
        }
    }
}

pub struct Dispatcher {
    resolver: Resolver,
    registry: CommandRegistry,
    navigator: Navigator,
    metrics: MetricsReader,
    transcripts: Arc<TranscriptLog>,
    exec_timeout_secs: u64,
}

impl Dispatcher {
    pub fn new(
        registry: CommandRegistry,
        navigator: Navigator,
        metrics: MetricsReader,
        transcripts: Arc<TranscriptLog>,
        exec_timeout_secs: u64,
    ) -> Self {
        Self {
            resolver: Resolver::new(registry.vocabulary()),
            registry,
            navigator,
            metrics,
            transcripts,
            exec_timeout_secs,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handle one raw input line for a session, returning the events to
    /// deliver to the owning connection.
    pub async fn handle(&self, session: &mut Session, raw: &str) -> Vec<ServerMessage> {
        let tab_id = session.tab_id().to_string();
        let trimmed = raw.trim();

        let command = match self.resolver.resolve(trimmed) {
            Ok(Resolution::Empty) => return Vec::new(),
            Ok(Resolution::Command(cmd)) => cmd,
            Err(ResolveError::UnrecognizedIntent { input, suggestions }) => {
                // Unrecognized shorthand never became a command: surface
                // the suggestion and skip the history append.
                let mut text = format!("Could not interpret '{input}'.");
                if !suggestions.is_empty() {
                    text.push_str(&format!(" Did you mean: {}?", suggestions.join(", ")));
                }
                self.transcripts
                    .record(&tab_id, trimmed, &text, OutputKind::Error);
                return vec![ServerMessage::Output {
                    tab_id,
                    output: text,
                    kind: OutputKind::Error,
                }];
            }
        };

        debug!(
            component = "dispatcher",
            event = "dispatch.command",
            tab_id = %tab_id,
            name = %command.name,
            natural_language = command.natural_language,
        );

        let result = self.run_command(session, &command).await;
        // A failed command was still "tried", so it goes to history too.
        session.append_history(trimmed);

        match result {
            Ok(out) => {
                self.transcripts
                    .record(&tab_id, trimmed, &out.output, OutputKind::Standard);
                let mut events = vec![ServerMessage::Output {
                    tab_id: tab_id.clone(),
                    output: out.output,
                    kind: OutputKind::Standard,
                }];
                if let Some(dir) = out.new_dir {
                    session.set_current_dir(dir.clone());
                    events.push(ServerMessage::DirectoryChange {
                        tab_id,
                        directory: dir.display().to_string(),
                    });
                }
                events
            }
            Err(err) => {
                let text = err.to_string();
                warn!(
                    component = "dispatcher",
                    event = "dispatch.command_failed",
                    tab_id = %tab_id,
                    name = %command.name,
                    error = %text,
                );
                self.transcripts
                    .record(&tab_id, trimmed, &text, OutputKind::Error);
                vec![ServerMessage::Output {
                    tab_id,
                    output: text,
                    kind: OutputKind::Error,
                }]
            }
        }
    }

    async fn run_command(
        &self,
        session: &Session,
        cmd: &ResolvedCommand,
    ) -> Result<CommandOutput, DispatchError> {
        let cwd = session.current_dir();
        let handler = self.registry.get(&cmd.name).map(|spec| spec.handler);

        match handler {
            Some(Handler::Navigator(op)) => {
                let outcome = match op {
                    NavOp::List => self.navigator.list(cwd, &cmd.args)?,
                    NavOp::ChangeDir => self.navigator.change_dir(cwd, &cmd.args)?,
                    NavOp::PrintWorkingDir => self.navigator.print_working_dir(cwd),
                    NavOp::MakeDir => self.navigator.make_dir(cwd, &cmd.args)?,
                    NavOp::RemoveDir => self.navigator.remove_dir(cwd, &cmd.args)?,
                    NavOp::Remove => self.navigator.remove(cwd, &cmd.args)?,
                    NavOp::Copy => self.navigator.copy(cwd, &cmd.args)?,
                    NavOp::Move => self.navigator.move_entry(cwd, &cmd.args)?,
                    NavOp::ReadFile => self.navigator.read_file(cwd, &cmd.args)?,
                    NavOp::Touch => self.navigator.touch(cwd, &cmd.args)?,
                };
                Ok(CommandOutput {
                    output: outcome.output,
                    new_dir: outcome.new_dir,
                })
            }

            Some(Handler::Metrics(query)) => {
                let snap = self.metrics.latest();
                let output = match query {
                    MetricsQuery::Cpu => format!("CPU usage: {:.1}%", snap.cpu_percent),
                    MetricsQuery::Memory => format!("Memory usage: {:.1}%", snap.memory_percent),
                    MetricsQuery::Processes => {
                        format!("Running processes: {}", snap.process_count)
                    }
                };
                Ok(CommandOutput::text(output))
            }

            Some(Handler::Builtin(builtin)) => Ok(CommandOutput::text(match builtin {
                Builtin::Echo => cmd.args.join(" "),
                Builtin::Clear => "\n".repeat(50),
                Builtin::Exit => "Exiting terminal...".to_string(),
            })),

            Some(Handler::Help) => Ok(CommandOutput::text(match cmd.args.first() {
                None => self.registry.catalogue(),
                Some(topic) => self
                    .registry
                    .describe(topic)
                    .unwrap_or_else(|| format!("help: no help topics match '{topic}'")),
            })),

            Some(Handler::History) => {
                let history = session.history();
                if history.is_empty() {
                    return Ok(CommandOutput::text("(no history)"));
                }
                let lines: Vec<String> = history
                    .iter()
                    .enumerate()
                    .map(|(i, cmd)| format!("{:>4}  {cmd}", i + 1))
                    .collect();
                Ok(CommandOutput::text(lines.join("\n")))
            }

            Some(Handler::External) => self.execute_external(session, cmd).await,

            None => {
                let suggestions = self.registry.suggest_similar(&cmd.name);
                if suggestions.is_empty() {
                    self.execute_external(session, cmd).await
                } else {
                    Err(DispatchError::UnknownCommand {
                        name: cmd.name.clone(),
                        suggestions,
                    })
                }
            }
        }
    }

    /// The generic host process invocation, the one dangerous primitive.
    async fn execute_external(
        &self,
        session: &Session,
        cmd: &ResolvedCommand,
    ) -> Result<CommandOutput, DispatchError> {
        if BLOCKED_PROGRAMS.contains(&cmd.name.as_str()) {
            return Err(DispatchError::Blocked {
                name: cmd.name.clone(),
            });
        }

        let outcome = shell::execute(
            &cmd.name,
            &cmd.args,
            session.current_dir(),
            self.exec_timeout_secs,
        )
        .await;

        match outcome {
            ExecOutcome::Completed {
                stdout,
                stderr,
                exit_code,
                duration_ms,
            } => {
                debug!(
                    component = "dispatcher",
                    event = "dispatch.exec.completed",
                    tab_id = %session.tab_id(),
                    name = %cmd.name,
                    exit_code = ?exit_code,
                    duration_ms,
                );
                let mut combined = stdout.trim_end().to_string();
                let stderr = stderr.trim_end();
                if !stderr.is_empty() {
                    if !combined.is_empty() {
                        combined.push('\n');
                    }
                    combined.push_str(stderr);
                }
                if combined.is_empty() {
                    combined = match exit_code {
                        Some(0) => "(Command executed successfully with no output)".to_string(),
                        code => format!("(command exited with status {})", code.unwrap_or(-1)),
                    };
                }
                Ok(CommandOutput::text(combined))
            }
            ExecOutcome::TimedOut { timeout_secs } => {
                Err(DispatchError::Timeout { timeout_secs })
            }
            ExecOutcome::Failed { reason } => Err(DispatchError::ExecutionFailed {
                name: cmd.name.clone(),
                reason,
            }),
        }
    }
}
