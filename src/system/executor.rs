//! Subprocess executor for the external tools (upsc, ping, ssh, wmic, winexe).
//! Every call is bounded by a timeout and the child is killed when it expires.

use std::time::Duration;

use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} failed ({status}): {stderr}")]
    Failed { program: String, status: String, stderr: String },
}

/// Runs external programs with a shared per-call timeout.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `program args...` and return its stdout.
    /// Arguments are not logged: some carry credentials.
    pub async fn run<I, S>(&self, program: &str, args: I) -> Result<String, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        trace!("Executing: {} (timeout {}s)", program, self.timeout.as_secs());

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                debug!("{} timed out after {}s, killed", program, self.timeout.as_secs());
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_stdout_on_success() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let out = runner.run("sh", ["-c", "echo OL"]).await.unwrap();
        assert_eq!(out.trim(), "OL");
    }

    #[tokio::test]
    async fn reports_non_zero_exit_with_stderr() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let err = runner.run("sh", ["-c", "echo nope >&2; exit 3"]).await.unwrap_err();
        match err {
            CommandError::Failed { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let err = runner.run("definitely-not-a-real-binary-7f3a", ["x"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn hung_command_times_out() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let err = runner.run("sleep", ["5"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
