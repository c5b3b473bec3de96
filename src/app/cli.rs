//! Command-line argument definitions (clap).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "upswatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "UPS monitor that powers down dependent hosts before the battery runs out", long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Set log level (TRACE, DEBUG, INFO, WARN, ERROR). Overrides LOG_LEVEL and the config file
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Validate the configuration, list the accepted hosts and exit
    #[arg(long)]
    pub check: bool,
}
