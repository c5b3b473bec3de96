//! Orchestrator: wires capabilities together, spawns both loops and waits for a stop signal.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::alerts::{AlertDispatcher, NotificationSink};
use crate::config::Config;
use crate::host::{HostRegistry, HostTransport, RemoteTransport};
use crate::metrics::{exporter, GaugeRegistry, MetricsSink, NoopMetrics};
use crate::monitor::{HostChecker, PowerMonitor};
use crate::system::CommandRunner;
use crate::ups::{NutClient, UpsSource};

pub struct Daemon {
    config: Config,
    hosts: Arc<HostRegistry>,
    ups: Arc<dyn UpsSource>,
    transport: Arc<dyn HostTransport>,
    alerts: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
    /// Present when the Prometheus exporter is enabled
    registry: Option<Arc<GaugeRegistry>>,
}

impl Daemon {
    /// Build the production capabilities from a loaded configuration.
    pub fn new(mut config: Config) -> Self {
        let general = &config.general;
        let hosts = Arc::new(HostRegistry::new(std::mem::take(&mut config.hosts)));

        let runner = CommandRunner::new(general.command_timeout.get());
        let ups: Arc<dyn UpsSource> = Arc::new(NutClient::new(general.tools.upsc.clone(), general.nut_name.clone(), runner));
        let transport: Arc<dyn HostTransport> = Arc::new(RemoteTransport::from_settings(general));

        let dispatcher = AlertDispatcher::from_settings(&general.alerts);
        if dispatcher.channel_count() == 0 {
            info!("No alert channel enabled; alerts will only be logged");
        }
        let alerts: Arc<dyn NotificationSink> = Arc::new(dispatcher);

        let (metrics, registry) = if general.prometheus_exporter.enable {
            let registry = Arc::new(GaugeRegistry::new());
            (registry.clone() as Arc<dyn MetricsSink>, Some(registry))
        } else {
            (Arc::new(NoopMetrics) as Arc<dyn MetricsSink>, None)
        };

        Self { config, hosts, ups, transport, alerts, metrics, registry }
    }

    /// Spawn both loops (and the exporter) and block until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let general = &self.config.general;
        info!(
            "Monitoring UPS '{}' with {} host(s)",
            general.nut_name,
            self.hosts.len()
        );
        if self.hosts.is_empty() {
            warn!("No valid host loaded; UPS state will be monitored but nothing will be shut down");
        }

        let checker = HostChecker::new(
            self.hosts.clone(),
            self.transport.clone(),
            self.alerts.clone(),
            self.metrics.clone(),
            general.host_checkup.interval.get(),
        );
        let checker_task = tokio::spawn(checker.run());

        let monitor = PowerMonitor::new(
            self.ups.clone(),
            self.hosts.clone(),
            self.transport.clone(),
            self.alerts.clone(),
            self.metrics.clone(),
            general.ups_poll_interval.get(),
        );
        let monitor_task = tokio::spawn(monitor.run());

        if let Some(registry) = self.registry.clone() {
            let port = general.prometheus_exporter.port;
            tokio::spawn(async move {
                if let Err(e) = exporter::serve(registry, port).await {
                    error!("Prometheus exporter failed: {:#}", e);
                }
            });
        }

        wait_for_shutdown().await;
        info!("Shutdown signal received, stopping");

        checker_task.abort();
        monitor_task.abort();
        Ok(())
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
}
