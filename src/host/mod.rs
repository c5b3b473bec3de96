//! Managed hosts: static description, shutdown lifecycle, shared registry.

pub mod probe;
pub mod shutdown;
pub mod ssh;
pub mod transport;
pub mod wmi;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

pub use shutdown::{shutdown_host, ShutdownOutcome};
pub use transport::{HostTransport, RemoteTransport, TransportError};

/// How a host is reached and powered off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    /// SSH with key authentication (Linux, ESXi, NAS appliances...)
    Ssh { port: u16, username: String },
    /// Windows management (WMI) with username/password
    Wmi { username: String, password: String },
}

impl HostKind {
    pub fn label(&self) -> &'static str {
        match self {
            HostKind::Ssh { .. } => "ssh",
            HostKind::Wmi { .. } => "wmi",
        }
    }
}

/// Where a host is in its one-way shutdown lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    Active = 0,
    /// A shutdown attempt has been claimed and is in flight
    ShuttingDown = 1,
    ShutDown = 2,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Active,
            1 => Lifecycle::ShuttingDown,
            _ => Lifecycle::ShutDown,
        }
    }
}

pub struct HostRecord {
    pub id: String,
    /// Network address used by probes and transports (defaults to `id`)
    pub address: String,
    pub kind: HostKind,
    /// Minimum UPS runtime this host needs to keep running
    pub runtime_limit_secs: u64,
    pub shutdown_commands: Vec<String>,
    lifecycle: AtomicU8,
    last_reachable: AtomicBool,
    last_accessible: AtomicBool,
}

impl HostRecord {
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        kind: HostKind,
        runtime_limit_secs: u64,
        shutdown_commands: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            kind,
            runtime_limit_secs,
            shutdown_commands,
            lifecycle: AtomicU8::new(Lifecycle::Active as u8),
            last_reachable: AtomicBool::new(false),
            last_accessible: AtomicBool::new(false),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    /// True once a shutdown attempt has started; never reverts.
    pub fn is_shut_down(&self) -> bool {
        self.lifecycle() != Lifecycle::Active
    }

    /// Claim the single shutdown attempt this host will ever get.
    /// Exactly one caller observes `true`, however many race.
    pub fn try_claim_shutdown(&self) -> bool {
        self.lifecycle
            .compare_exchange(
                Lifecycle::Active as u8,
                Lifecycle::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Terminal transition, applied whatever the attempt's outcome.
    pub fn mark_shut_down(&self) {
        self.lifecycle.store(Lifecycle::ShutDown as u8, Ordering::Release);
    }

    pub fn record_check(&self, reachable: bool, accessible: bool) {
        self.last_reachable.store(reachable, Ordering::Relaxed);
        self.last_accessible.store(accessible, Ordering::Relaxed);
    }

    pub fn last_reachable(&self) -> bool {
        self.last_reachable.load(Ordering::Relaxed)
    }

    pub fn last_accessible(&self) -> bool {
        self.last_accessible.load(Ordering::Relaxed)
    }

    /// Whether a battery with `runtime_secs` left can no longer carry this host.
    pub fn exceeds_runtime(&self, runtime_secs: u64) -> bool {
        self.runtime_limit_secs > runtime_secs
    }
}

// Hand-written so credentials never reach the logs.
impl fmt::Debug for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRecord")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("kind", &self.kind.label())
            .field("runtime_limit_secs", &self.runtime_limit_secs)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Fixed set of hosts shared by both monitoring loops.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: Vec<Arc<HostRecord>>,
}

impl HostRegistry {
    pub fn new(hosts: Vec<HostRecord>) -> Self {
        Self { hosts: hosts.into_iter().map(Arc::new).collect() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HostRecord>> {
        self.hosts.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Arc<HostRecord>> {
        self.hosts.iter().filter(|h| !h.is_shut_down())
    }

    /// Active hosts the remaining runtime can no longer carry, in registry order.
    pub fn over_runtime(&self, runtime_secs: u64) -> Vec<Arc<HostRecord>> {
        self.active()
            .filter(|h| h.exceeds_runtime(runtime_secs))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Arc<HostRecord>> {
        self.hosts.iter().find(|h| h.id == id)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn ssh_host(id: &str, limit: u64) -> HostRecord {
    HostRecord::new(
        id,
        id,
        HostKind::Ssh { port: 22, username: "root".to_string() },
        limit,
        vec!["poweroff".to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_selects_hosts_needing_more_than_remaining() {
        let host = ssh_host("nas", 120);
        assert!(host.exceeds_runtime(100));

        let host = ssh_host("nas", 100);
        assert!(!host.exceeds_runtime(120));
        assert!(!host.exceeds_runtime(100));
    }

    #[test]
    fn claim_succeeds_once_and_lifecycle_is_monotonic() {
        let host = ssh_host("db", 60);
        assert_eq!(host.lifecycle(), Lifecycle::Active);

        assert!(host.try_claim_shutdown());
        assert!(host.is_shut_down());
        assert!(!host.try_claim_shutdown());

        host.mark_shut_down();
        assert_eq!(host.lifecycle(), Lifecycle::ShutDown);
        assert!(!host.try_claim_shutdown());
        assert!(host.is_shut_down());
    }

    #[test]
    fn concurrent_claims_have_a_single_winner() {
        let host = Arc::new(ssh_host("race", 60));
        let winners: usize = (0..16)
            .map(|_| {
                let host = Arc::clone(&host);
                std::thread::spawn(move || host.try_claim_shutdown())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }

    #[test]
    fn registry_excludes_shut_down_hosts() {
        let registry = HostRegistry::new(vec![ssh_host("a", 300), ssh_host("b", 30)]);
        assert_eq!(registry.over_runtime(100).len(), 1);

        let a = registry.get("a").unwrap();
        assert!(a.try_claim_shutdown());
        assert!(registry.over_runtime(100).is_empty());
        assert_eq!(registry.active().count(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let host = HostRecord::new(
            "win",
            "10.0.0.5",
            HostKind::Wmi { username: "admin".into(), password: "hunter2".into() },
            60,
            vec![],
        );
        assert!(!format!("{host:?}").contains("hunter2"));
    }
}
