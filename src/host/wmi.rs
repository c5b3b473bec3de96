//! Windows management transport: `wmic` for the handshake query,
//! `winexe` for remote process creation.

use tracing::debug;

use crate::system::{CommandError, CommandRunner};

const HANDSHAKE_QUERY: &str = "SELECT Caption FROM Win32_OperatingSystem";

pub struct WmiTransport {
    wmic: String,
    winexe: String,
    runner: CommandRunner,
}

impl WmiTransport {
    pub fn new(wmic: impl Into<String>, winexe: impl Into<String>, runner: CommandRunner) -> Self {
        Self { wmic: wmic.into(), winexe: winexe.into(), runner }
    }

    pub async fn handshake(&self, address: &str, username: &str, password: &str) -> Result<(), CommandError> {
        self.runner
            .run(&self.wmic, session_args(address, username, password, HANDSHAKE_QUERY))
            .await?;
        Ok(())
    }

    /// Create one remote process per command, in order. Stops at the first failure.
    pub async fn spawn_each(
        &self,
        address: &str,
        username: &str,
        password: &str,
        commands: &[String],
    ) -> Result<(), CommandError> {
        for (i, command) in commands.iter().enumerate() {
            debug!("Creating remote process {}/{} on {}", i + 1, commands.len(), address);
            self.runner
                .run(&self.winexe, session_args(address, username, password, command))
                .await?;
        }
        Ok(())
    }
}

fn session_args(address: &str, username: &str, password: &str, payload: &str) -> [String; 4] {
    [
        "-U".to_string(),
        format!("{}%{}", username, password),
        format!("//{}", address),
        payload.to_string(),
    ]
}
