use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A rendered notification ready to publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub submission_id: Uuid,
    pub topic: String,
    pub subject: String,
    pub message: String,
}

/// A notification tracked in the queue. Every announcement gets a row before
/// its first publish, so a row's status is the delivery state of its submission.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub topic: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: DateTime<Utc>,
    /// When the current `processing` claim was taken.
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueuedNotification {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Failed for good: no attempts left and nothing will retry it.
    pub fn is_exhausted(&self) -> bool {
        self.status == "failed" && self.attempts >= self.max_attempts
    }
}
