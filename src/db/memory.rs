use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    NotificationQueue, Page, PutOutcome, StoreError, SubmissionStore, CLAIM_TIMEOUT_SECS,
};
use crate::models::{Notification, QueuedNotification, Submission};

/// Process-local store for development and tests. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryStore {
    submissions: RwLock<BTreeMap<Uuid, Submission>>,
    queue: Mutex<Vec<QueuedNotification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.submissions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the retry queue, oldest first.
    pub async fn queued(&self) -> Vec<QueuedNotification> {
        self.queue.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn put(&self, submission: &Submission) -> Result<PutOutcome, StoreError> {
        let mut submissions = self.submissions.write().await;
        if let Some(existing) = submissions.get(&submission.id) {
            return Ok(PutOutcome::Existing(existing.clone()));
        }
        submissions.insert(submission.id, submission.clone());
        Ok(PutOutcome::Created(submission.clone()))
    }

    async fn scan(&self, after: Option<Uuid>, limit: usize) -> Result<Page, StoreError> {
        let limit = limit.max(1);
        let submissions = self.submissions.read().await;
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        let mut items: Vec<Submission> = submissions
            .range((lower, Bound::Unbounded))
            .take(limit + 1)
            .map(|(_, s)| s.clone())
            .collect();

        let next_cursor = if items.len() > limit {
            items.truncate(limit);
            items.last().map(|s| s.id)
        } else {
            None
        };

        Ok(Page { items, next_cursor })
    }
}

#[async_trait]
impl NotificationQueue for MemoryStore {
    async fn enqueue(
        &self,
        notification: &Notification,
        max_attempts: i32,
    ) -> Result<QueuedNotification, StoreError> {
        let now = Utc::now();
        let item = QueuedNotification {
            id: Uuid::now_v7(),
            submission_id: notification.submission_id,
            topic: notification.topic.clone(),
            subject: notification.subject.clone(),
            message: notification.message.clone(),
            status: "processing".to_string(),
            attempts: 0,
            max_attempts,
            last_error: None,
            next_retry_at: now,
            claimed_at: Some(now),
            created_at: now,
            completed_at: None,
        };
        self.queue.lock().await.push(item.clone());
        Ok(item)
    }

    async fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        let mut queue = self.queue.lock().await;
        if let Some(item) = queue
            .iter_mut()
            .find(|item| item.id == id && item.status == "processing")
        {
            item.status = "pending".to_string();
            item.last_error = Some(error.to_string());
            item.next_retry_at = Utc::now();
            item.claimed_at = None;
        }
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<QueuedNotification>, StoreError> {
        let now = Utc::now();
        let stale_before = now - chrono::Duration::seconds(CLAIM_TIMEOUT_SECS);
        let mut queue = self.queue.lock().await;

        let next = queue
            .iter_mut()
            .filter(|item| {
                let due = match item.status.as_str() {
                    "pending" | "failed" => item.next_retry_at <= now,
                    "processing" => item.claimed_at.is_some_and(|at| at < stale_before),
                    _ => false,
                };
                due && item.attempts < item.max_attempts
            })
            .min_by_key(|item| item.next_retry_at);

        Ok(next.map(|item| {
            item.status = "processing".to_string();
            item.attempts += 1;
            item.claimed_at = Some(now);
            item.clone()
        }))
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError> {
        let mut queue = self.queue.lock().await;
        if let Some(item) = queue.iter_mut().find(|item| item.id == id) {
            item.status = "completed".to_string();
            item.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        max_attempts: i32,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut queue = self.queue.lock().await;
        let Some(item) = queue.iter_mut().find(|item| item.id == id) else {
            return Ok(());
        };

        item.status = "failed".to_string();
        item.last_error = Some(error.to_string());
        if attempts >= max_attempts {
            item.completed_at = Some(Utc::now());
        } else {
            item.next_retry_at =
                Utc::now() + chrono::Duration::seconds(super::retry_backoff_secs(attempts));
        }
        Ok(())
    }

    async fn latest_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<QueuedNotification>, StoreError> {
        let queue = self.queue.lock().await;
        Ok(queue
            .iter()
            .rev()
            .find(|item| item.submission_id == submission_id)
            .cloned())
    }
}
