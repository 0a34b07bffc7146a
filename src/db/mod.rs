pub mod memory;
pub mod notification_queue;
pub mod postgres;
pub mod submissions;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Notification, QueuedNotification, Submission};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "Database error: {err}"),
            StoreError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Result of writing a record keyed by its id.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    Created(Submission),
    /// A record with the same id already existed; it is returned unchanged.
    Existing(Submission),
}

/// One bounded slice of a table scan.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Submission>,
    /// Pass back to `scan` to continue; `None` once the table is exhausted.
    pub next_cursor: Option<Uuid>,
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn put(&self, submission: &Submission) -> Result<PutOutcome, StoreError>;

    /// Records with an id strictly greater than `after`, at most `limit` of them.
    async fn scan(&self, after: Option<Uuid>, limit: usize) -> Result<Page, StoreError>;

    async fn scan_all(&self) -> Result<Vec<Submission>, StoreError> {
        let mut all = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.scan(cursor, SCAN_ALL_PAGE_SIZE).await?;
            all.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(all),
            }
        }
    }
}

const SCAN_ALL_PAGE_SIZE: usize = 500;

/// A `processing` claim older than this is assumed abandoned and is handed out
/// again. Longer than the notifier publish timeout.
pub const CLAIM_TIMEOUT_SECS: i64 = 60;

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Record a notification about to be published inline. The row starts out
    /// `processing`, claimed by the caller, with no attempts counted.
    async fn enqueue(
        &self,
        notification: &Notification,
        max_attempts: i32,
    ) -> Result<QueuedNotification, StoreError>;

    /// Hand an inline claim back to the workers, due immediately.
    async fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    /// Claim the next due item, moving it to `processing` and bumping `attempts`.
    /// Claims older than `CLAIM_TIMEOUT_SECS` are due again.
    async fn claim_next(&self) -> Result<Option<QueuedNotification>, StoreError>;

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError>;

    /// Record a failure; reschedules with exponential backoff until `max_attempts`.
    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        max_attempts: i32,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Most recent row for a submission, if it was ever announced.
    async fn latest_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<QueuedNotification>, StoreError>;
}

/// Backoff before the next retry: 2^attempts seconds.
pub fn retry_backoff_secs(attempts: i32) -> i64 {
    2_i64.pow(attempts.clamp(0, 20) as u32)
}
