//! Configuration loading: typed settings, duration parsing, host validation.

pub mod duration;
pub mod persistence;
pub mod types;

use std::path::PathBuf;

use crate::host::HostRecord;
use types::GeneralSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid duration {0:?} (expected <int><s|m|h>)")]
    InvalidDuration(String),

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("unable to load host {host}: {reason}")]
    InvalidHost { host: String, reason: String },
}

/// Immutable snapshot produced once at startup.
#[derive(Debug)]
pub struct Config {
    pub general: GeneralSettings,
    pub hosts: Vec<HostRecord>,
    /// Host entries that were dropped; reported once logging is up.
    pub rejected: Vec<ConfigError>,
}
