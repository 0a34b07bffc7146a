use async_trait::async_trait;

use super::{Notifier, NotifyError, Topic};

/// Writes notifications to the log. Useful when no real channel is wired up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn schemes(&self) -> &[&'static str] {
        &["log"]
    }

    fn name(&self) -> &str {
        "Log"
    }

    async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(topic = topic.target(), subject, "{message}");
        Ok(())
    }
}
