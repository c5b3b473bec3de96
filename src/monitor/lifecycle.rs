//! Host checker: periodic reachability and accessibility checks of active hosts.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::alerts::{Alert, Level, NotificationSink, Trigger};
use crate::host::{HostRecord, HostRegistry, HostTransport};
use crate::metrics::{Gauge, HostStatus, MetricsSink};

/// Result of checking one host during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Reachable,
    Unreachable,
    Inaccessible,
    PoweredOff,
}

pub struct HostChecker {
    hosts: Arc<HostRegistry>,
    transport: Arc<dyn HostTransport>,
    alerts: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
    interval: Duration,
}

impl HostChecker {
    pub fn new(
        hosts: Arc<HostRegistry>,
        transport: Arc<dyn HostTransport>,
        alerts: Arc<dyn NotificationSink>,
        metrics: Arc<dyn MetricsSink>,
        interval: Duration,
    ) -> Self {
        Self { hosts, transport, alerts, metrics, interval }
    }

    pub async fn run(self) {
        info!("Host checker started (every {}s)", self.interval.as_secs());
        let mut ticker = super::ticker(self.interval);

        loop {
            ticker.tick().await;
            let tick = async {
                self.tick().await;
            };
            super::guarded_tick("host checker", tick, self.alerts.as_ref()).await;
        }
    }

    /// Check every host once, then raise one summary alert if any failed.
    pub async fn tick(&self) -> Vec<(String, CheckResult)> {
        info!("Performing connection tests on all hosts...");

        let mut results = Vec::with_capacity(self.hosts.len());
        for host in self.hosts.iter() {
            let result = self.check(host).await;
            results.push((host.id.clone(), result));
        }

        let failing: Vec<&str> = results
            .iter()
            .filter(|(_, r)| matches!(r, CheckResult::Unreachable | CheckResult::Inaccessible))
            .map(|(id, _)| id.as_str())
            .collect();

        if failing.is_empty() {
            info!("✅ All hosts have been checked and all of them are reachable!");
        } else {
            warn!("One or more host(s) unreachable: {}", failing.join(", "));
            self.alerts
                .notify(Alert::new(
                    Level::Warn,
                    Trigger::HostUnreachable,
                    format!("{} host(s) unreachable!", failing.len()),
                    format!(
                        "The last connection test could not reach: {}. Please check logs for more info.",
                        failing.join(", ")
                    ),
                ))
                .await;
        }

        results
    }

    async fn check(&self, host: &HostRecord) -> CheckResult {
        let result = self.probe(host).await;

        let status = match result {
            CheckResult::Reachable => HostStatus::Reachable,
            CheckResult::PoweredOff => HostStatus::PoweredOff,
            CheckResult::Unreachable | CheckResult::Inaccessible => HostStatus::Unreachable,
        };
        self.metrics.set(Gauge::HostStatus, &[("host", host.id.as_str())], status.value());
        result
    }

    async fn probe(&self, host: &HostRecord) -> CheckResult {
        if host.is_shut_down() {
            return CheckResult::PoweredOff;
        }

        if let Err(e) = self.transport.check_alive(host).await {
            if host.is_shut_down() {
                return CheckResult::PoweredOff;
            }
            host.record_check(false, false);
            warn!("There is no ping response from {} host! Perhaps it is offline? ({})", host.id, e);
            self.alerts
                .notify(Alert::new(
                    Level::Warn,
                    Trigger::HostUnreachable,
                    format!("{} unreachable!", host.id),
                    format!("There is no ping response from {} host! Perhaps it is offline?", host.id),
                ))
                .await;
            return CheckResult::Unreachable;
        }

        // Shut down by the power monitor while we were probing
        if host.is_shut_down() {
            return CheckResult::PoweredOff;
        }

        if let Err(e) = self.transport.check_accessible(host).await {
            if host.is_shut_down() {
                return CheckResult::PoweredOff;
            }
            host.record_check(true, false);
            warn!("Unable to access {} host via {}: {}", host.id, host.kind.label(), e);
            self.alerts
                .notify(Alert::new(
                    Level::Warn,
                    Trigger::HostConnectionFail,
                    format!("Unable to access {} host!", host.id),
                    format!(
                        "Unable to access {} host via {}! Please check to make sure the host is reachable from this monitor. Please check logs for more info.",
                        host.id,
                        host.kind.label().to_uppercase()
                    ),
                ))
                .await;
            return CheckResult::Inaccessible;
        }

        if !host.last_reachable() || !host.last_accessible() {
            info!("Host {} is reachable and accessible via {}", host.id, host.kind.label());
        } else {
            debug!("Host {} is reachable and accessible", host.id);
        }
        host.record_check(true, true);
        CheckResult::Reachable
    }
}
