//! The two polling loops and the scaffolding they share.

pub mod lifecycle;
pub mod power;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::{self, MissedTickBehavior};
use tracing::error;

use crate::alerts::{Alert, Level, NotificationSink, Trigger};

pub use lifecycle::HostChecker;
pub use power::PowerMonitor;

/// Ticker for a polling loop. A tick that overruns delays the next one
/// instead of firing a burst to catch up.
pub(crate) fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run one tick, containing a panic so the loop survives it.
/// Returns false when the tick panicked.
pub(crate) async fn guarded_tick<F>(loop_name: &str, tick: F, alerts: &dyn NotificationSink) -> bool
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(tick).catch_unwind().await {
        Ok(()) => true,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("{} tick aborted: {}", loop_name, reason);
            alerts
                .notify(Alert::new(
                    Level::Error,
                    Trigger::UnexpectedError,
                    format!("Unexpected error in the {}!", loop_name),
                    format!("The {} hit an unexpected error and skipped a cycle: {}. Please see logs for more info.", loop_name, reason),
                ))
                .await;
            false
        }
    }
}
