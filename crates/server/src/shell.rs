//! Generic process execution for commands outside the registry.
//!
//! Runs a program in a tab's working directory and captures output.
//! This is the boundary to the host: the engine only defines the
//! contract, not any sandboxing of the child. On timeout the child is
//! abandoned, not killed; a known limitation.

use std::path::Path;
use std::time::Instant;

use tokio::process::Command;

/// Result of a host process invocation
#[derive(Debug)]
pub enum ExecOutcome {
    Completed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
    TimedOut {
        timeout_secs: u64,
    },
    Failed {
        reason: String,
    },
}

/// Execute `program args..` in `cwd` with a timeout, capturing
/// stdout + stderr.
pub async fn execute(program: &str, args: &[String], cwd: &Path, timeout_secs: u64) -> ExecOutcome {
    let start = Instant::now();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(timeout_secs),
        run_command(program, args, cwd),
    )
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok((stdout, stderr, exit_code))) => ExecOutcome::Completed {
            stdout,
            stderr,
            exit_code: Some(exit_code),
            duration_ms,
        },
        Ok(Err(e)) => ExecOutcome::Failed {
            reason: e.to_string(),
        },
        Err(_) => ExecOutcome::TimedOut { timeout_secs },
    }
}

async fn run_command(
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<(String, String, i32), std::io::Error> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code().unwrap_or(-1);

    Ok((stdout, stderr, exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let outcome = execute("echo", &["hello".to_string()], Path::new("/tmp"), 5).await;
        match outcome {
            ExecOutcome::Completed {
                stdout, exit_code, ..
            } => {
                assert_eq!(stdout.trim(), "hello");
                assert_eq!(exit_code, Some(0));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let outcome = execute(
            "definitely-not-a-real-binary",
            &[],
            Path::new("/tmp"),
            5,
        )
        .await;
        assert!(matches!(outcome, ExecOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let outcome = execute("sleep", &["5".to_string()], Path::new("/tmp"), 1).await;
        match outcome {
            ExecOutcome::TimedOut { timeout_secs } => assert_eq!(timeout_secs, 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
