//! Email alert delivery via SMTP.
//!
//! [`EmailChannel`] sends a `multipart/alternative` message (plain text and
//! HTML) over an implicit-TLS SMTP relay with login credentials.

use async_trait::async_trait;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Alert, AlertChannel, AlertError};
use crate::config::types::SmtpSettings;

const SIGNATURE: &str = "Upswatch";

pub struct EmailChannel {
    settings: SmtpSettings,
}

impl EmailChannel {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, AlertError> {
        Message::builder()
            .from(self.settings.user.parse()?)
            .to(self.settings.to_address.parse()?)
            .subject(alert.subject())
            .multipart(MultiPart::alternative_plain_html(
                text_body(&alert.body),
                html_body(&alert.body),
            ))
            .map_err(|e| AlertError::Build(e.to_string()))
    }
}

fn text_body(body: &str) -> String {
    format!("Systems Administrator,\n{}\nThank You,\n{} on {}", body, SIGNATURE, origin())
}

fn html_body(body: &str) -> String {
    format!(
        "<html><head></head><body>\
         <p>Systems Administrator,</p><p>{}</p>\
         <p>Thank You,<br /><b>{}</b> on {}</p>\
         </body></html>",
        escape_html(body),
        SIGNATURE,
        escape_html(&origin())
    )
}

fn origin() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown host".to_string())
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let message = self.build_message(alert)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.host)?
            .port(self.settings.port)
            .credentials(Credentials::new(self.settings.user.clone(), self.settings.password.clone()))
            .build();

        mailer.send(message).await?;
        tracing::info!("Email alert sent to {}: {}", self.settings.to_address, alert.title);
        Ok(())
    }
}
