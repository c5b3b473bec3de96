//! Chat alert delivery through a Slack incoming webhook.

use std::time::Duration;

use async_trait::async_trait;

use super::{Alert, AlertChannel, AlertError};
use crate::config::types::SlackSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ATTACHMENT_COLOR: &str = "FF0000";

pub struct SlackChannel {
    settings: SlackSettings,
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(settings: SlackSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { settings, client }
    }

    fn payload(&self, alert: &Alert) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "username": self.settings.username,
            "attachments": [{
                "color": ATTACHMENT_COLOR,
                "title": alert.subject(),
                "text": alert.body,
            }],
        });
        if let Some(channel) = &self.settings.channel {
            payload["channel"] = serde_json::Value::from(channel.as_str());
        }
        if let Some(icon) = &self.settings.icon {
            payload["icon_emoji"] = serde_json::Value::from(icon.as_str());
        }
        payload
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.settings.webhook_url)
            .json(&self.payload(alert))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::HttpStatus { service: "slack", status: status.as_u16(), body });
        }
        Ok(())
    }
}
