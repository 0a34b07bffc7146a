use async_trait::async_trait;
use serde_json::json;

use super::{Notifier, NotifyError, Topic};

/// Posts `{topic, subject, message}` as JSON to an `http(s)://` topic.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to build webhook client: {e}"))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn schemes(&self) -> &[&'static str] {
        &["http", "https"]
    }

    fn name(&self) -> &str {
        "Webhook"
    }

    async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(topic.as_str())
            .json(&json!({
                "topic": topic.as_str(),
                "subject": subject,
                "message": message,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::from(format!("Webhook request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(256)
            .collect::<String>();
        Err(NotifyError::from(format!(
            "Webhook returned {}: {body}",
            status.as_u16()
        )))
    }
}
