//! upswatch entry point: CLI parsing, configuration load, logging, daemon start.

mod alerts;
mod app;
mod config;
mod daemon;
mod host;
mod metrics;
mod monitor;
mod system;
mod ups;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use app::cli::Args;
use app::logging::{init_tracing, resolve_filter};
use config::persistence::load_config;
use config::Config;
use daemon::Daemon;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                std::process::exit(0);
            }
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    // Logging is not up yet, so a fatal config error goes straight to stderr
    let config = match load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let env_level = std::env::var("LOG_LEVEL").ok();
    let filter = resolve_filter(
        args.log_level.as_deref(),
        env_level.as_deref(),
        config.general.log_level.filter(),
    );
    init_tracing(filter);

    info!("upswatch v{} starting ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS);
    info!("Loaded configuration from: {:?}", args.config);
    for rejected in &config.rejected {
        error!("{}", rejected);
    }

    if args.check {
        print_hosts(&config);
        return Ok(());
    }

    Daemon::new(config).run().await?;

    info!("upswatch stopped");
    Ok(())
}

fn print_hosts(config: &Config) {
    println!("UPS: {}", config.general.nut_name);
    println!("{} host(s) accepted, {} rejected", config.hosts.len(), config.rejected.len());
    for host in &config.hosts {
        println!(
            "  {:<24} {:<4} {:<24} runtime limit {}s",
            host.id,
            host.kind.label(),
            host.address,
            host.runtime_limit_secs
        );
    }
}
