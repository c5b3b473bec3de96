//! UpsSource trait definition and telemetry types.

use async_trait::async_trait;

use crate::system::CommandError;

pub mod nut;

pub use nut::NutClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    Grid,
    Battery,
}

/// Auxiliary readings published as gauges. Fields the UPS does not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsTelemetry {
    pub load_percent: Option<f64>,
    pub realpower_nominal: Option<f64>,
    pub charge_percent: Option<f64>,
    pub runtime_secs: Option<f64>,
    pub input_voltage: Option<f64>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpsError {
    #[error("upsc query failed: {0}")]
    Command(#[from] CommandError),

    #[error("unexpected value for {key}: {value:?}")]
    Parse { key: &'static str, value: String },

    #[error("UPS reported neither OL nor OB: {0:?}")]
    UnknownStatus(String),
}

#[async_trait]
pub trait UpsSource: Send + Sync {
    /// Load, power, charge, voltage, runtime, manufacturer and model
    async fn telemetry(&self) -> Result<UpsTelemetry, UpsError>;

    /// Whether the UPS is running from mains or battery
    async fn power_source(&self) -> Result<PowerSource, UpsError>;

    /// Estimated remaining battery runtime in seconds
    async fn runtime_secs(&self) -> Result<u64, UpsError>;
}
