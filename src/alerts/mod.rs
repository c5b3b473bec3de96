//! Alerts: severity, trigger gates, and parallel fan-out to delivery channels.

pub mod email;
pub mod pushover;
pub mod slack;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, error, info};

use crate::config::types::{AlertSettings, TriggerSettings};

pub use email::EmailChannel;
pub use pushover::PushoverChannel;
pub use slack::SlackChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        })
    }
}

/// Event class an alert belongs to; each one is gated separately in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    HostUnreachable,
    HostConnectionFail,
    HostTurnedOff,
    UpsStatusChange,
    UnexpectedError,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::HostUnreachable => "host_unreachable",
            Trigger::HostConnectionFail => "host_connection_fail",
            Trigger::HostTurnedOff => "host_turned_off",
            Trigger::UpsStatusChange => "ups_status_change",
            Trigger::UnexpectedError => "unexpected_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: Level,
    pub trigger: Trigger,
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn new(level: Level, trigger: Trigger, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { level, trigger, title: title.into(), body: body.into() }
    }

    /// "[WARN]: UPS on battery mode!"
    pub fn subject(&self) -> String {
        format!("[{}]: {}", self.level, self.title)
    }
}

/// Fire-and-forget alert delivery as seen by the monitoring loops.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, alert: Alert);
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    HttpStatus { service: &'static str, status: u16, body: String },

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(String),
}

/// One outbound delivery channel (email, push, chat webhook).
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Gates alerts by trigger and delivers them to every enabled channel concurrently.
/// Delivery runs on its own task; `notify` never waits for a channel.
pub struct AlertDispatcher {
    triggers: TriggerSettings,
    channels: Arc<[Arc<dyn AlertChannel>]>,
}

impl AlertDispatcher {
    pub fn new(triggers: TriggerSettings, channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { triggers, channels: channels.into() }
    }

    /// Build the channels that are switched on in the alert settings.
    pub fn from_settings(settings: &AlertSettings) -> Self {
        let mut channels: Vec<Arc<dyn AlertChannel>> = Vec::new();

        if let Some(smtp) = settings.smtp.as_ref().filter(|s| s.enabled) {
            channels.push(Arc::new(EmailChannel::new(smtp.clone())));
        }
        if let Some(pushover) = settings.pushover.as_ref().filter(|s| s.enabled) {
            channels.push(Arc::new(PushoverChannel::new(pushover.clone())));
        }
        if let Some(slack) = settings.slack.as_ref().filter(|s| s.enabled) {
            channels.push(Arc::new(SlackChannel::new(slack.clone())));
        }

        info!(
            "Alert channels enabled: {}",
            if channels.is_empty() {
                "none".to_string()
            } else {
                channels.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
            }
        );

        Self::new(settings.triggers.clone(), channels)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl NotificationSink for AlertDispatcher {
    async fn notify(&self, alert: Alert) {
        if !self.triggers.allows(alert.trigger) {
            debug!("Alert '{}' suppressed ({} trigger disabled)", alert.title, alert.trigger.as_str());
            return;
        }
        if self.channels.is_empty() {
            return;
        }

        let channels = Arc::clone(&self.channels);
        tokio::spawn(async move { deliver_all(&channels, &alert).await });
    }
}

/// Deliver one alert to every channel in parallel; failures are logged per channel.
async fn deliver_all(channels: &[Arc<dyn AlertChannel>], alert: &Alert) {
    let deliveries = channels
        .iter()
        .map(|channel| async move { (channel.name(), channel.deliver(alert).await) });

    for (name, result) in join_all(deliveries).await {
        match result {
            Ok(()) => debug!("{} alert sent: {}", name, alert.title),
            Err(e) => error!("Unable to send {} alert '{}': {}", name, alert.title, e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingChannel {
        name: &'static str,
        fail: bool,
        delivered: AtomicUsize,
    }

    impl CountingChannel {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self { name, fail, delivered: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl AlertChannel for CountingChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn deliver(&self, _alert: &Alert) -> Result<(), AlertError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.delivered.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AlertError::Build("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn triggers() -> TriggerSettings {
        TriggerSettings { host_turned_off: true, ..TriggerSettings::default() }
    }

    #[tokio::test]
    async fn disabled_trigger_reaches_no_channel() {
        let channel = CountingChannel::new("email", false);
        let dispatcher = AlertDispatcher::new(triggers(), vec![channel.clone()]);

        dispatcher
            .notify(Alert::new(Level::Error, Trigger::UnexpectedError, "oops", "details"))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_the_others() {
        let broken = CountingChannel::new("pushover", true);
        let healthy = CountingChannel::new("slack", false);
        let channels: Vec<Arc<dyn AlertChannel>> = vec![broken.clone(), healthy.clone()];

        deliver_all(&channels, &Alert::new(Level::Info, Trigger::HostTurnedOff, "nas off", "powered down")).await;

        assert_eq!(broken.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn notify_returns_before_delivery_completes() {
        let channel = CountingChannel::new("email", false);
        let dispatcher = AlertDispatcher::new(triggers(), vec![channel.clone()]);

        dispatcher
            .notify(Alert::new(Level::Info, Trigger::HostTurnedOff, "nas off", "powered down"))
            .await;

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subject_carries_level() {
        let alert = Alert::new(Level::Warn, Trigger::UpsStatusChange, "UPS on battery mode!", "");
        assert_eq!(alert.subject(), "[WARN]: UPS on battery mode!");
    }

    #[test]
    fn from_settings_only_builds_enabled_channels() {
        let settings: AlertSettings = serde_yaml::from_str(
            "smtp:\n  enabled: false\n  host: mail\n  user: u\n  password: p\n  to_address: a@b.c\n\
             slack:\n  enabled: true\n  webhook_url: https://hooks.example.com/x\n",
        )
        .unwrap();
        assert_eq!(AlertDispatcher::from_settings(&settings).channel_count(), 1);
    }
}
