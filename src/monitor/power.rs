//! Power monitor: UPS polling, grid/battery state machine, runtime-ordered shedding.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::alerts::{Alert, Level, NotificationSink, Trigger};
use crate::host::{shutdown_host, HostRegistry, HostTransport, ShutdownOutcome};
use crate::metrics::{Gauge, HostStatus, MetricsSink};
use crate::ups::{PowerSource, UpsSource, UpsTelemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    OnGrid,
    OnBattery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerState {
    pub mode: PowerMode,
    /// Last successful runtime reading; `None` when the latest query failed
    pub last_known_runtime_secs: Option<u64>,
}

impl Default for PowerState {
    fn default() -> Self {
        Self { mode: PowerMode::OnGrid, last_known_runtime_secs: None }
    }
}

pub struct PowerMonitor {
    ups: Arc<dyn UpsSource>,
    hosts: Arc<HostRegistry>,
    transport: Arc<dyn HostTransport>,
    alerts: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
    interval: Duration,
    state: PowerState,
    brand_published: bool,
    model_published: bool,
}

impl PowerMonitor {
    pub fn new(
        ups: Arc<dyn UpsSource>,
        hosts: Arc<HostRegistry>,
        transport: Arc<dyn HostTransport>,
        alerts: Arc<dyn NotificationSink>,
        metrics: Arc<dyn MetricsSink>,
        interval: Duration,
    ) -> Self {
        Self {
            ups,
            hosts,
            transport,
            alerts,
            metrics,
            interval,
            state: PowerState::default(),
            brand_published: false,
            model_published: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &PowerState {
        &self.state
    }

    /// Poll forever at the configured interval.
    pub async fn run(mut self) {
        info!("Power monitor started (every {}s)", self.interval.as_secs_f64());
        let mut ticker = super::ticker(self.interval);
        let alerts = Arc::clone(&self.alerts);

        loop {
            ticker.tick().await;
            super::guarded_tick("power monitor", self.tick(), alerts.as_ref()).await;
        }
    }

    /// One poll: telemetry, status, mode transition, and shedding while on battery.
    pub async fn tick(&mut self) {
        if self.metrics.enabled() {
            self.publish_telemetry().await;
        }

        let source = match self.ups.power_source().await {
            Ok(source) => source,
            Err(e) => {
                // Indeterminate: keep the previous mode, apply nothing
                error!("Unexpected error while trying to retrieve status from UPS via upsc: {}", e);
                self.metrics.set(Gauge::UpsStatus, &[], -1.0);
                self.alert_unexpected(
                    "Error on retrieving UPS status!",
                    format!("Unexpected error while trying to retrieve status from UPS via upsc ({}). Please see logs for more info.", e),
                )
                .await;
                return;
            }
        };

        match source {
            PowerSource::Grid => self.on_grid().await,
            PowerSource::Battery => self.on_battery().await,
        }
    }

    async fn on_grid(&mut self) {
        self.metrics.set(Gauge::UpsStatus, &[], 0.0);

        if self.state.mode == PowerMode::OnBattery {
            info!("✅ Power has been detected from the grid. The UPS has changed back to power grid mode");
            self.alerts
                .notify(Alert::new(
                    Level::Info,
                    Trigger::UpsStatusChange,
                    "UPS back on power grid mode!",
                    "Power has been detected from the grid. The UPS has changed back to power grid mode and the battery will be charged whenever needed.",
                ))
                .await;
            self.state.mode = PowerMode::OnGrid;
        }
        debug!("UPS is on power grid mode, ignoring...");
    }

    async fn on_battery(&mut self) {
        self.metrics.set(Gauge::UpsStatus, &[], 1.0);

        if self.state.mode == PowerMode::OnGrid {
            warn!("⚠️ Power outage has been detected! The UPS has changed to battery mode, watching battery runtime...");
            self.alerts
                .notify(Alert::new(
                    Level::Warn,
                    Trigger::UpsStatusChange,
                    "UPS on battery mode!",
                    "Power outage has been detected! The UPS has changed to battery mode, proceeding to watch battery's runtime...",
                ))
                .await;
            self.state.mode = PowerMode::OnBattery;
        }

        match self.ups.runtime_secs().await {
            Ok(runtime) => {
                self.state.last_known_runtime_secs = Some(runtime);
                self.shed_hosts(runtime).await;
            }
            Err(e) => {
                self.state.last_known_runtime_secs = None;
                error!("Unexpected error while trying to retrieve runtime from the UPS via upsc: {}", e);
                self.alert_unexpected(
                    "Error while retrieving UPS runtime status!",
                    format!("Unexpected error while trying to retrieve runtime from the UPS via upsc ({}). Please see logs for more info.", e),
                )
                .await;
            }
        }
    }

    /// Shut down every active host whose runtime limit exceeds what is left.
    /// Re-evaluated each tick, so hosts are shed progressively as runtime drains.
    async fn shed_hosts(&self, runtime: u64) {
        let doomed = self.hosts.over_runtime(runtime);
        if doomed.is_empty() {
            debug!("Battery runtime {}s still covers every active host", runtime);
            return;
        }

        warn!("Battery runtime {}s is below the limit of {} host(s), shutting down", runtime, doomed.len());
        for host in doomed {
            match shutdown_host(&host, self.transport.as_ref(), self.alerts.as_ref()).await {
                ShutdownOutcome::Completed | ShutdownOutcome::Failed(_) => {
                    self.metrics.set(Gauge::HostStatus, &[("host", host.id.as_str())], HostStatus::PoweredOff.value());
                }
                ShutdownOutcome::AlreadyClaimed => debug!("Host {} already being shut down", host.id),
            }
        }
    }

    async fn publish_telemetry(&mut self) {
        match self.ups.telemetry().await {
            Ok(telemetry) => self.publish(&telemetry),
            Err(e) => {
                error!("Unexpected error while trying to retrieve other statistics from UPS via upsc: {}", e);
                self.alert_unexpected(
                    "Error while retrieving other UPS statistics!",
                    format!("Unexpected error while trying to retrieve other statistics from UPS via upsc ({}). Please see logs for more info.", e),
                )
                .await;
            }
        }
    }

    fn publish(&mut self, t: &UpsTelemetry) {
        let numeric = [
            (Gauge::UpsLoad, t.load_percent),
            (Gauge::UpsRealpower, t.realpower_nominal),
            (Gauge::UpsCharge, t.charge_percent),
            (Gauge::UpsRuntime, t.runtime_secs),
            (Gauge::UpsInputVoltage, t.input_voltage),
        ];
        for (gauge, value) in numeric {
            if let Some(value) = value {
                self.metrics.set(gauge, &[], value);
            }
        }

        // Brand and model never change; publish them once
        if let (false, Some(brand)) = (self.brand_published, t.manufacturer.as_deref()) {
            self.metrics.set(Gauge::UpsBrand, &[("brand", brand)], 1.0);
            self.brand_published = true;
        }
        if let (false, Some(model)) = (self.model_published, t.model.as_deref()) {
            self.metrics.set(Gauge::UpsModel, &[("model", model)], 1.0);
            self.model_published = true;
        }
    }

    async fn alert_unexpected(&self, title: &str, body: String) {
        self.alerts
            .notify(Alert::new(Level::Error, Trigger::UnexpectedError, title, body))
            .await;
    }
}
