//! SSH transport through the OpenSSH client, key authentication only.

use std::path::PathBuf;

use tracing::debug;

use crate::system::{CommandError, CommandRunner};

pub struct SshTransport {
    ssh: String,
    private_key: Option<PathBuf>,
    runner: CommandRunner,
}

impl SshTransport {
    pub fn new(ssh: impl Into<String>, private_key: Option<PathBuf>, runner: CommandRunner) -> Self {
        Self { ssh: ssh.into(), private_key, runner }
    }

    /// Log in and leave immediately.
    pub async fn handshake(&self, address: &str, port: u16, username: &str) -> Result<(), CommandError> {
        self.runner.run(&self.ssh, self.args(address, port, username, "exit 0")).await?;
        Ok(())
    }

    /// Run every command in one remote invocation, joined with `; `.
    pub async fn execute(
        &self,
        address: &str,
        port: u16,
        username: &str,
        commands: &[String],
    ) -> Result<(), CommandError> {
        let remote = commands.join("; ");
        debug!("Executing {} shutdown command(s) on {} via SSH", commands.len(), address);
        match self.runner.run(&self.ssh, self.args(address, port, username, &remote)).await {
            Ok(_) => Ok(()),
            // poweroff/halt tear the session down before the commands can exit
            Err(e) if closed_by_remote(&e) => {
                debug!("SSH session to {} closed by the remote host after dispatch", address);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn args(&self, address: &str, port: u16, username: &str, remote: &str) -> Vec<String> {
        let connect_timeout = self.runner.timeout().as_secs().max(1);
        let mut args = Vec::new();
        if let Some(key) = &self.private_key {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().to_string());
        }
        args.extend([
            "-p".to_string(),
            port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", connect_timeout),
            format!("{}@{}", username, address),
            remote.to_string(),
        ]);
        args
    }
}

/// ssh exits 255 both for connection errors and for a session dropped by the
/// server; only the latter carries this message.
fn closed_by_remote(err: &CommandError) -> bool {
    matches!(
        err,
        CommandError::Failed { status, stderr, .. }
            if status.ends_with("255") && stderr.contains("closed by remote host")
    )
}
