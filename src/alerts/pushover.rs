//! Push alert delivery through the Pushover messages API.

use std::time::Duration;

use async_trait::async_trait;

use super::{Alert, AlertChannel, AlertError};
use crate::config::types::PushoverSettings;

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PushoverChannel {
    settings: PushoverSettings,
    client: reqwest::Client,
    url: String,
}

impl PushoverChannel {
    pub fn new(settings: PushoverSettings) -> Self {
        Self::with_url(settings, PUSHOVER_URL)
    }

    pub fn with_url(settings: PushoverSettings, url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { settings, client, url: url.into() }
    }

    fn payload(&self, alert: &Alert) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "token": self.settings.token,
            "user": self.settings.user,
            "priority": self.settings.priority,
            "title": alert.subject(),
            "message": alert.body,
        });
        if !self.settings.devices.is_empty() {
            payload["device"] = serde_json::Value::from(self.settings.devices.join(","));
        }
        payload
    }
}

#[async_trait]
impl AlertChannel for PushoverChannel {
    fn name(&self) -> &'static str {
        "pushover"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let response = self.client.post(&self.url).json(&self.payload(alert)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::HttpStatus { service: "pushover", status: status.as_u16(), body });
        }

        tracing::info!("Pushover notification has been sent!");
        Ok(())
    }
}
