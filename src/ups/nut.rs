//! NUT client — implements UpsSource by querying `upsc`.

use async_trait::async_trait;

use super::{PowerSource, UpsError, UpsSource, UpsTelemetry};
use crate::system::{parser, CommandRunner};

pub struct NutClient {
    upsc: String,
    ups_name: String,
    runner: CommandRunner,
}

impl NutClient {
    pub fn new(upsc: impl Into<String>, ups_name: impl Into<String>, runner: CommandRunner) -> Self {
        Self { upsc: upsc.into(), ups_name: ups_name.into(), runner }
    }

    async fn query(&self, variable: Option<&str>) -> Result<String, UpsError> {
        let mut args = vec![self.ups_name.as_str()];
        args.extend(variable);
        Ok(self.runner.run(&self.upsc, args).await?)
    }
}

#[async_trait]
impl UpsSource for NutClient {
    async fn telemetry(&self) -> Result<UpsTelemetry, UpsError> {
        let listing = self.query(None).await?;
        Ok(parser::parse_telemetry(&listing))
    }

    async fn power_source(&self) -> Result<PowerSource, UpsError> {
        let status = self.query(Some("ups.status")).await?;
        parser::parse_power_source(&status)
    }

    async fn runtime_secs(&self) -> Result<u64, UpsError> {
        let runtime = self.query(Some("battery.runtime")).await?;
        parser::parse_runtime(&runtime)
    }
}
