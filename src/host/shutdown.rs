//! The one-shot shutdown operation on a host.
//!
//! A host gets exactly one attempt. The attempt is claimed atomically before
//! any command runs, and the host ends up `ShutDown` whether the commands
//! succeeded or not, so a host that is already off (or unreachable) is never
//! retried.

use tracing::{info, warn};

use super::{HostRecord, HostTransport, TransportError};
use crate::alerts::{Alert, Level, NotificationSink, Trigger};

#[derive(Debug)]
pub enum ShutdownOutcome {
    Completed,
    Failed(TransportError),
    /// Another caller already claimed this host's attempt
    AlreadyClaimed,
}

pub async fn shutdown_host(
    host: &HostRecord,
    transport: &dyn HostTransport,
    alerts: &dyn NotificationSink,
) -> ShutdownOutcome {
    if !host.try_claim_shutdown() {
        return ShutdownOutcome::AlreadyClaimed;
    }

    let outcome = match transport.shutdown(host).await {
        Ok(()) => {
            info!("🔌 Host {} has been powered down due to UPS's current runtime", host.id);
            alerts
                .notify(Alert::new(
                    Level::Info,
                    Trigger::HostTurnedOff,
                    format!("Host {} has been turned off!", host.id),
                    format!("Host {} has been powered down due to UPS's current runtime.", host.id),
                ))
                .await;
            ShutdownOutcome::Completed
        }
        Err(e) => {
            warn!("Unable to shutdown {} host: {}", host.id, e);
            alerts
                .notify(Alert::new(
                    Level::Warn,
                    Trigger::HostTurnedOff,
                    format!("Unable to shutdown {} host!", host.id),
                    format!(
                        "Unable to shutdown {} host due to an unexpected error ({}). It will not be retried.",
                        host.id, e
                    ),
                ))
                .await;
            ShutdownOutcome::Failed(e)
        }
    };

    host.mark_shut_down();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::testing::RecordingSink;
    use crate::host::transport::testing::FakeTransport;
    use crate::host::{ssh_host, Lifecycle};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn successful_shutdown_marks_host_and_notifies() {
        let host = ssh_host("nas", 300);
        let transport = FakeTransport::default();
        let alerts = RecordingSink::default();

        let outcome = shutdown_host(&host, &transport, &alerts).await;

        assert!(matches!(outcome, ShutdownOutcome::Completed));
        assert_eq!(host.lifecycle(), Lifecycle::ShutDown);
        let sent = alerts.alerts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].level, Level::Info);
        assert_eq!(sent[0].trigger, Trigger::HostTurnedOff);
    }

    #[tokio::test]
    async fn failed_shutdown_still_ends_shut_down() {
        let host = ssh_host("nas", 300);
        let transport = FakeTransport::default();
        transport.failing_shutdown.lock().unwrap().insert("nas".into());
        let alerts = RecordingSink::default();

        let outcome = shutdown_host(&host, &transport, &alerts).await;

        assert!(matches!(outcome, ShutdownOutcome::Failed(TransportError::Command { .. })));
        assert_eq!(host.lifecycle(), Lifecycle::ShutDown);
        assert_eq!(alerts.alerts()[0].level, Level::Warn);

        // never retried
        let again = shutdown_host(&host, &transport, &alerts).await;
        assert!(matches!(again, ShutdownOutcome::AlreadyClaimed));
        assert_eq!(transport.calls_for("nas", "shutdown"), 1);
    }

    #[tokio::test]
    async fn racing_callers_issue_a_single_attempt() {
        let host = Arc::new(ssh_host("nas", 300));
        let transport = Arc::new(FakeTransport::with_shutdown_delay(Duration::from_millis(20)));
        let alerts = Arc::new(RecordingSink::default());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let (host, transport, alerts) = (host.clone(), transport.clone(), alerts.clone());
                tokio::spawn(async move { shutdown_host(&host, transport.as_ref(), alerts.as_ref()).await })
            })
            .collect();

        let mut completed = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), ShutdownOutcome::Completed) {
                completed += 1;
            }
        }

        assert_eq!(completed, 1);
        assert_eq!(transport.calls_for("nas", "shutdown"), 1);
        assert_eq!(alerts.count(Trigger::HostTurnedOff), 1);
    }
}
