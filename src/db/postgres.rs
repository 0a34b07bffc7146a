use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{notification_queue, submissions};
use super::{NotificationQueue, Page, PutOutcome, StoreError, SubmissionStore};
use crate::models::{Notification, QueuedNotification, Submission};

/// Postgres-backed store. All records of one logical table share the
/// `collection` column.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    collection: String,
}

impl PgStore {
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn put(&self, submission: &Submission) -> Result<PutOutcome, StoreError> {
        if let Some(created) =
            submissions::insert_if_absent(&self.pool, &self.collection, submission).await?
        {
            return Ok(PutOutcome::Created(created));
        }

        let existing = submissions::find_by_id(&self.pool, &self.collection, submission.id)
            .await?
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "Submission {} conflicted but could not be read back",
                    submission.id
                ))
            })?;
        Ok(PutOutcome::Existing(existing))
    }

    async fn scan(&self, after: Option<Uuid>, limit: usize) -> Result<Page, StoreError> {
        let limit = limit.max(1);
        let mut items =
            submissions::list_after(&self.pool, &self.collection, after, limit as i64 + 1).await?;

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
impl NotificationQueue for PgStore {
    async fn enqueue(
        &self,
        notification: &Notification,
        max_attempts: i32,
    ) -> Result<QueuedNotification, StoreError> {
        Ok(notification_queue::enqueue(&self.pool, notification, max_attempts).await?)
    }

    async fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        Ok(notification_queue::release(&self.pool, id, error).await?)
    }

    async fn claim_next(&self) -> Result<Option<QueuedNotification>, StoreError> {
        Ok(notification_queue::claim_next(&self.pool).await?)
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError> {
        Ok(notification_queue::mark_completed(&self.pool, id).await?)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        max_attempts: i32,
        error: &str,
    ) -> Result<(), StoreError> {
        Ok(notification_queue::mark_failed(&self.pool, id, attempts, max_attempts, error).await?)
    }

    async fn latest_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<QueuedNotification>, StoreError> {
        Ok(notification_queue::latest_for_submission(&self.pool, submission_id).await?)
    }
}
