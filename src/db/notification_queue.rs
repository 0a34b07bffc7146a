use sqlx::PgPool;
use uuid::Uuid;

use super::CLAIM_TIMEOUT_SECS;
use crate::models::{Notification, QueuedNotification};

/// Insert already claimed by the caller for its inline publish.
pub async fn enqueue(
    pool: &PgPool,
    notification: &Notification,
    max_attempts: i32,
) -> Result<QueuedNotification, sqlx::Error> {
    sqlx::query_as::<_, QueuedNotification>(
        "INSERT INTO notification_queue
             (submission_id, topic, subject, message, max_attempts, status, claimed_at)
         VALUES ($1, $2, $3, $4, $5, 'processing', now()) RETURNING *",
    )
    .bind(notification.submission_id)
    .bind(&notification.topic)
    .bind(&notification.subject)
    .bind(&notification.message)
    .bind(max_attempts)
    .fetch_one(pool)
    .await
}

pub async fn release(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE notification_queue
         SET status = 'pending', last_error = $2, next_retry_at = now(), claimed_at = NULL
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically claim the next ready item using SELECT FOR UPDATE SKIP LOCKED.
/// Stale `processing` claims count as ready.
pub async fn claim_next(pool: &PgPool) -> Result<Option<QueuedNotification>, sqlx::Error> {
    sqlx::query_as::<_, QueuedNotification>(
        "UPDATE notification_queue
         SET status = 'processing', attempts = attempts + 1, claimed_at = now()
         WHERE id = (
             SELECT id FROM notification_queue
             WHERE attempts < max_attempts
               AND (
                   (status IN ('pending', 'failed') AND next_retry_at <= now())
                   OR (status = 'processing'
                       AND claimed_at < now() - make_interval(secs => $1::double precision))
               )
             ORDER BY next_retry_at ASC
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(CLAIM_TIMEOUT_SECS as f64)
    .fetch_optional(pool)
    .await
}

pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE notification_queue SET status = 'completed', completed_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark as failed. Once max attempts is reached the item stays 'failed' permanently.
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    max_attempts: i32,
    error: &str,
) -> Result<(), sqlx::Error> {
    if attempts >= max_attempts {
        sqlx::query(
            "UPDATE notification_queue SET status = 'failed', last_error = $2, completed_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
    } else {
        let backoff_secs = super::retry_backoff_secs(attempts);
        sqlx::query(
            "UPDATE notification_queue
             SET status = 'failed',
                 last_error = $2,
                 next_retry_at = now() + make_interval(secs => $3::double precision)
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(backoff_secs as f64)
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub async fn latest_for_submission(
    pool: &PgPool,
    submission_id: Uuid,
) -> Result<Option<QueuedNotification>, sqlx::Error> {
    sqlx::query_as::<_, QueuedNotification>(
        "SELECT * FROM notification_queue
         WHERE submission_id = $1
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}
