//! Server configuration.
//!
//! Resolved once at startup from CLI flags and `WEBTERM_*` environment
//! variables. All runtime knobs live here; modules receive the values they
//! need rather than reading the environment themselves.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "webterm", about = "WebTerm server, a multi-tab web terminal backend")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "WEBTERM_BIND", default_value = "127.0.0.1:4000")]
    pub bind: SocketAddr,

    /// Initial working directory for new tabs (defaults to the home directory)
    #[arg(long, env = "WEBTERM_ROOT_DIR")]
    pub root_dir: Option<PathBuf>,

    /// Confine navigation and destructive operations to this path
    #[arg(long, env = "WEBTERM_SANDBOX_ROOT")]
    pub sandbox_root: Option<PathBuf>,

    /// Maximum history entries kept per tab (oldest evicted)
    #[arg(long, env = "WEBTERM_HISTORY_LIMIT", default_value_t = 200)]
    pub history_limit: usize,

    /// Skip appending a command identical to the previous history entry
    #[arg(
        long,
        env = "WEBTERM_HISTORY_DEDUP",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub history_dedup: bool,

    /// Seconds between system metrics broadcasts
    #[arg(long, env = "WEBTERM_METRICS_INTERVAL_SECS", default_value_t = 2)]
    pub metrics_interval_secs: u64,

    /// Seconds before a generic command execution times out
    #[arg(long, env = "WEBTERM_EXEC_TIMEOUT_SECS", default_value_t = 10)]
    pub exec_timeout_secs: u64,

    /// Seconds a disconnected tab's state is retained for reconnects
    #[arg(long, env = "WEBTERM_SESSION_LINGER_SECS", default_value_t = 60)]
    pub session_linger_secs: u64,

    /// Maximum entries in the global transcript log backing log export
    #[arg(long, env = "WEBTERM_TRANSCRIPT_LIMIT", default_value_t = 1000)]
    pub transcript_limit: usize,

    /// Data directory for logs (defaults to ~/.webterm)
    #[arg(long, env = "WEBTERM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// The directory new tabs start in.
    ///
    /// Priority: `--root-dir` > `--sandbox-root` > home > `/tmp`. A root
    /// outside a configured sandbox is clamped to the sandbox root so the
    /// very first prompt is already inside the boundary.
    pub fn resolved_root(&self) -> PathBuf {
        let root = self
            .root_dir
            .clone()
            .or_else(|| self.sandbox_root.clone())
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/tmp"));

        if let Some(sandbox) = &self.sandbox_root {
            if !root.starts_with(sandbox) {
                return sandbox.clone();
            }
        }
        root
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".webterm")
        })
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs.max(1))
    }

    pub fn session_linger(&self) -> Duration {
        Duration::from_secs(self.session_linger_secs)
    }
}
