//! HostTransport trait definition and the kind-dispatching implementation.

use std::time::Duration;

use async_trait::async_trait;

use super::probe::PingProbe;
use super::ssh::SshTransport;
use super::wmi::WmiTransport;
use super::{HostKind, HostRecord};
use crate::config::types::GeneralSettings;
use crate::system::{CommandError, CommandRunner};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no ping response from {host}: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: CommandError,
    },

    #[error("unable to access {host} via {protocol}: {source}")]
    Handshake {
        host: String,
        protocol: &'static str,
        #[source]
        source: CommandError,
    },

    #[error("shutdown command failed on {host}: {source}")]
    Command {
        host: String,
        #[source]
        source: CommandError,
    },
}

/// Reachability, accessibility and shutdown for one host.
#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Network-level liveness probe
    async fn check_alive(&self, host: &HostRecord) -> Result<(), TransportError>;

    /// Protocol-level handshake (login without side effects)
    async fn check_accessible(&self, host: &HostRecord) -> Result<(), TransportError>;

    /// Run the host's shutdown commands
    async fn shutdown(&self, host: &HostRecord) -> Result<(), TransportError>;
}

/// Production transport: ping for liveness, then SSH or WMI by host kind.
pub struct RemoteTransport {
    probe: PingProbe,
    ssh: SshTransport,
    wmi: WmiTransport,
}

impl RemoteTransport {
    pub fn new(probe: PingProbe, ssh: SshTransport, wmi: WmiTransport) -> Self {
        Self { probe, ssh, wmi }
    }

    pub fn from_settings(general: &GeneralSettings) -> Self {
        let timeout: Duration = general.command_timeout.get();
        let runner = CommandRunner::new(timeout);
        Self::new(
            PingProbe::new(general.tools.ping.clone(), runner.clone()),
            SshTransport::new(general.tools.ssh.clone(), general.private_key.clone(), runner.clone()),
            WmiTransport::new(general.tools.wmic.clone(), general.tools.winexe.clone(), runner),
        )
    }
}

#[async_trait]
impl HostTransport for RemoteTransport {
    async fn check_alive(&self, host: &HostRecord) -> Result<(), TransportError> {
        self.probe.ping(&host.address).await.map_err(|source| TransportError::Unreachable {
            host: host.id.clone(),
            source,
        })
    }

    async fn check_accessible(&self, host: &HostRecord) -> Result<(), TransportError> {
        let result = match &host.kind {
            HostKind::Ssh { port, username } => self.ssh.handshake(&host.address, *port, username).await,
            HostKind::Wmi { username, password } => self.wmi.handshake(&host.address, username, password).await,
        };
        result.map_err(|source| TransportError::Handshake {
            host: host.id.clone(),
            protocol: host.kind.label(),
            source,
        })
    }

    async fn shutdown(&self, host: &HostRecord) -> Result<(), TransportError> {
        let result = match &host.kind {
            HostKind::Ssh { port, username } => {
                self.ssh.execute(&host.address, *port, username, &host.shutdown_commands).await
            }
            HostKind::Wmi { username, password } => {
                self.wmi.spawn_each(&host.address, username, password, &host.shutdown_commands).await
            }
        };
        result.map_err(|source| TransportError::Command { host: host.id.clone(), source })
    }
}
