//! Configuration document structs and defaults.

use std::path::PathBuf;

use serde::Deserialize;

use super::duration::HumanDuration;
use crate::alerts::Trigger;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSettings {
    #[serde(default)]
    pub log_level: LogLevelSetting,
    /// UPS name as known to the NUT server (`upsc <nut_name>`)
    pub nut_name: String,
    #[serde(default)]
    pub host_checkup: HostCheckupSettings,
    #[serde(default = "default_ups_poll_interval")]
    pub ups_poll_interval: HumanDuration,
    /// Upper bound for every external call (probe, handshake, shutdown, upsc)
    #[serde(default = "default_command_timeout")]
    pub command_timeout: HumanDuration,
    #[serde(default, alias = "private_rsa_key")]
    pub private_key: Option<PathBuf>,
    #[serde(default)]
    pub prometheus_exporter: ExporterSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

pub fn default_ups_poll_interval() -> HumanDuration { HumanDuration::from_secs(1) }
pub fn default_command_timeout() -> HumanDuration { HumanDuration::from_secs(30) }

/// Log verbosity: a level name, or the legacy numeric scale (0=info, 1=warn, 2=error).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LogLevelSetting {
    Legacy(u8),
    Name(String),
}

impl Default for LogLevelSetting {
    fn default() -> Self {
        LogLevelSetting::Name("info".to_string())
    }
}

impl LogLevelSetting {
    /// Map the setting onto a tracing filter directive.
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevelSetting::Legacy(0) => "info",
            LogLevelSetting::Legacy(1) => "warn",
            LogLevelSetting::Legacy(_) => "error",
            LogLevelSetting::Name(name) => level_filter(name).unwrap_or("info"),
        }
    }
}

/// Normalize a user-supplied level name; `None` when unrecognized.
pub fn level_filter(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostCheckupSettings {
    #[serde(default = "default_checkup_interval")]
    pub interval: HumanDuration,
}

pub fn default_checkup_interval() -> HumanDuration { HumanDuration::from_secs(60) }

impl Default for HostCheckupSettings {
    fn default() -> Self {
        Self { interval: default_checkup_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterSettings {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_exporter_port")]
    pub port: u16,
}

pub fn default_exporter_port() -> u16 { 9100 }

impl Default for ExporterSettings {
    fn default() -> Self {
        Self { enable: false, port: default_exporter_port() }
    }
}

/// External binaries the transports shell out to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub upsc: String,
    pub ping: String,
    pub ssh: String,
    pub wmic: String,
    pub winexe: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            upsc: "upsc".to_string(),
            ping: "ping".to_string(),
            ssh: "ssh".to_string(),
            wmic: "wmic".to_string(),
            winexe: "winexe".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub triggers: TriggerSettings,
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
    #[serde(default)]
    pub pushover: Option<PushoverSettings>,
    #[serde(default)]
    pub slack: Option<SlackSettings>,
}

/// Per-trigger gates. Everything is off unless switched on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    pub host_unreachable: bool,
    pub host_connection_fail: bool,
    pub host_turned_off: bool,
    pub ups_status_change: bool,
    pub unexpected_error: bool,
}

impl TriggerSettings {
    pub fn allows(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::HostUnreachable => self.host_unreachable,
            Trigger::HostConnectionFail => self.host_connection_fail,
            Trigger::HostTurnedOff => self.host_turned_off,
            Trigger::UpsStatusChange => self.ups_status_change,
            Trigger::UnexpectedError => self.unexpected_error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub enabled: bool,
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub to_address: String,
}

pub fn default_smtp_port() -> u16 { 465 }

#[derive(Debug, Clone, Deserialize)]
pub struct PushoverSettings {
    #[serde(default)]
    pub enabled: bool,
    pub token: String,
    pub user: String,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub priority: i8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    #[serde(default)]
    pub enabled: bool,
    pub webhook_url: String,
    #[serde(default = "default_slack_username")]
    pub username: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

pub fn default_slack_username() -> String { "upswatch".to_string() }

/// One `hosts.<id>` entry as written. Every field is optional so that a
/// single bad entry can be rejected without failing the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostEntry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub runtime_limit: Option<String>,
    /// Network address when it differs from the host id
    pub address: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub commands: Option<Vec<String>>,
}

/// Shutdown command used for Windows hosts that list none.
pub const DEFAULT_WINDOWS_SHUTDOWN: &str = "shutdown /s /f /t 0";
