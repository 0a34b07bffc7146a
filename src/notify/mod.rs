pub mod email;
pub mod log;
pub mod template;
pub mod webhook;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Notification, Submission};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct NotifyError {
    pub message: String,
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NotifyError {}

impl From<String> for NotifyError {
    fn from(s: String) -> Self {
        NotifyError { message: s }
    }
}

impl From<&str> for NotifyError {
    fn from(s: &str) -> Self {
        NotifyError {
            message: s.to_string(),
        }
    }
}

/// Notification destination written as `scheme:target`, e.g.
/// `mailto:ops@example.com`, `https://hooks.example.com/x` or `log:submissions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    scheme: String,
    raw: String,
}

impl Topic {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after `scheme:`.
    pub fn target(&self) -> &str {
        &self.raw[self.scheme.len() + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (scheme, target) = raw
            .split_once(':')
            .ok_or_else(|| format!("topic '{raw}' has no scheme"))?;

        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(format!("topic '{raw}' has an invalid scheme"));
        }
        if target.trim().is_empty() {
            return Err(format!("topic '{raw}' has no target"));
        }

        Ok(Topic {
            scheme: scheme.to_ascii_lowercase(),
            raw: format!("{}:{target}", scheme.to_ascii_lowercase()),
        })
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Topic schemes this notifier delivers to.
    fn schemes(&self) -> &[&'static str];
    fn name(&self) -> &str;
    async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        for scheme in notifier.schemes() {
            self.notifiers
                .insert(scheme.to_string(), Arc::clone(&notifier));
        }
    }

    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn Notifier>> {
        self.notifiers.get(scheme)
    }

    pub fn supports(&self, topic: &Topic) -> bool {
        self.notifiers.contains_key(topic.scheme())
    }

    pub async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let notifier = self.get(topic.scheme()).ok_or_else(|| {
            NotifyError::from(format!(
                "No notifier configured for topic scheme '{}'",
                topic.scheme()
            ))
        })?;

        tracing::debug!("Publishing to {topic} via {}", notifier.name());

        match tokio::time::timeout(PUBLISH_TIMEOUT, notifier.publish(topic, subject, message)).await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::from(format!(
                "Publish to {topic} timed out after {}s",
                PUBLISH_TIMEOUT.as_secs()
            ))),
        }
    }

    pub async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let topic: Topic = notification.topic.parse().map_err(NotifyError::from)?;
        self.publish(&topic, &notification.subject, &notification.message)
            .await
    }
}

/// Render the notification announcing a stored submission.
pub fn compose(
    topic: &Topic,
    subject: &str,
    body_template: &str,
    submission: &Submission,
) -> Notification {
    Notification {
        submission_id: submission.id,
        topic: topic.to_string(),
        subject: template::render(subject, submission),
        message: template::render(body_template, submission),
    }
}
