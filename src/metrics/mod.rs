//! MetricsSink trait definition and the gauges the monitors publish.

pub mod exporter;
pub mod registry;

pub use registry::GaugeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gauge {
    HostStatus,
    UpsCharge,
    UpsRuntime,
    UpsInputVoltage,
    UpsLoad,
    UpsRealpower,
    UpsStatus,
    UpsBrand,
    UpsModel,
}

impl Gauge {
    pub const ALL: [Gauge; 9] = [
        Gauge::HostStatus,
        Gauge::UpsCharge,
        Gauge::UpsRuntime,
        Gauge::UpsInputVoltage,
        Gauge::UpsLoad,
        Gauge::UpsRealpower,
        Gauge::UpsStatus,
        Gauge::UpsBrand,
        Gauge::UpsModel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gauge::HostStatus => "ups_host_status",
            Gauge::UpsCharge => "ups_charge",
            Gauge::UpsRuntime => "ups_runtime",
            Gauge::UpsInputVoltage => "ups_input_voltage",
            Gauge::UpsLoad => "ups_load",
            Gauge::UpsRealpower => "ups_realpower",
            Gauge::UpsStatus => "ups_status",
            Gauge::UpsBrand => "ups_brand",
            Gauge::UpsModel => "ups_model",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Gauge::HostStatus => "Host status (0=unreachable, 1=reachable, 2=powered off)",
            Gauge::UpsCharge => "Current battery charge in percent",
            Gauge::UpsRuntime => "Estimated battery runtime in seconds",
            Gauge::UpsInputVoltage => "Input voltage in volts",
            Gauge::UpsLoad => "UPS load in percent",
            Gauge::UpsRealpower => "Nominal real power in watts (load / 100 * realpower = watts drawn)",
            Gauge::UpsStatus => "UPS power source (0=on grid, 1=on battery, -1=unknown)",
            Gauge::UpsBrand => "UPS manufacturer",
            Gauge::UpsModel => "UPS model",
        }
    }
}

/// Values of `ups_host_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Unreachable = 0,
    Reachable = 1,
    PoweredOff = 2,
}

impl HostStatus {
    pub fn value(self) -> f64 {
        self as i32 as f64
    }
}

/// Write-only gauge sink used by both monitoring loops.
pub trait MetricsSink: Send + Sync {
    fn set(&self, gauge: Gauge, labels: &[(&'static str, &str)], value: f64);

    /// False when nothing is exported; lets callers skip telemetry-only queries.
    fn enabled(&self) -> bool {
        true
    }
}

/// Sink used when the exporter is switched off.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set(&self, _gauge: Gauge, _labels: &[(&'static str, &str)], _value: f64) {}

    fn enabled(&self) -> bool {
        false
    }
}
