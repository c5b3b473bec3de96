//! ICMP liveness probe through the system `ping`.

use crate::system::{CommandError, CommandRunner};

const PING_COUNT: &str = "2";

pub struct PingProbe {
    ping: String,
    runner: CommandRunner,
}

impl PingProbe {
    pub fn new(ping: impl Into<String>, runner: CommandRunner) -> Self {
        Self { ping: ping.into(), runner }
    }

    /// Succeeds when `address` answers at least one echo request.
    pub async fn ping(&self, address: &str) -> Result<(), CommandError> {
        self.runner.run(&self.ping, ping_args(address, self.runner.timeout().as_secs())).await?;
        Ok(())
    }
}

fn ping_args(address: &str, timeout_secs: u64) -> Vec<String> {
    // -W bounds each reply wait; the runner bounds the whole call
    let wait = timeout_secs.clamp(1, 10).to_string();
    vec!["-c".into(), PING_COUNT.into(), "-W".into(), wait, address.to_string()]
}
