use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::Utc;
use serde::Serialize;

use crate::db::PutOutcome;
use crate::error::AppError;
use crate::models::Submission;
use crate::notify;
use crate::state::SharedState;

use super::fields::{self, FieldError};
use super::metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Published inline.
    Sent,
    /// Inline publish failed; the retry worker will deliver it.
    Queued,
    /// Inline publish failed and it could not be queued either.
    Failed,
    /// Nothing to announce (already announced, or spam).
    Skipped,
}

pub struct PipelineResult {
    pub submission: Option<Submission>,
    pub duplicate: bool,
    pub notification: NotificationStatus,
    pub spam: bool,
}

/// Store one submission, then announce it.
///
/// The notification is only attempted once the write has succeeded. A repeated
/// id is announced again only if no earlier announcement is delivered or still
/// pending, so a caller retrying after a failed notification gets it delivered.
pub async fn run(
    state: &SharedState,
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    raw_data: serde_json::Value,
) -> Result<PipelineResult, AppError> {
    let config = &state.config;

    let ip = metadata::client_ip(headers, peer_addr, &config.trusted_proxies);
    state.submission_limiter.check(ip).map_err(|wait| {
        let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        AppError::RateLimited(secs.max(1))
    })?;

    let trapped = config
        .honeypot_field
        .as_deref()
        .is_some_and(|field| fields::trap_filled(&raw_data, field));
    if trapped {
        tracing::debug!("Discarding honeypot submission from {ip}");
        return Ok(PipelineResult {
            submission: None,
            duplicate: false,
            notification: NotificationStatus::Skipped,
            spam: true,
        });
    }

    let new = fields::extract(&raw_data).map_err(|e| match e {
        FieldError::Missing(missing) => AppError::MissingFields(missing),
        other => AppError::BadRequest(other.to_string()),
    })?;

    let record = new.into_record(Utc::now());
    let outcome = state
        .store
        .put(&record)
        .await
        .map_err(|e| AppError::Storage("Could not save data.", e))?;

    let (submission, duplicate) = match outcome {
        PutOutcome::Created(s) => {
            tracing::info!("Stored submission {}", s.id);
            (s, false)
        }
        PutOutcome::Existing(s) => (s, true),
    };

    if duplicate {
        if let Some(status) = earlier_announcement(state, &submission).await {
            return Ok(PipelineResult {
                submission: Some(submission),
                duplicate: true,
                notification: status,
                spam: false,
            });
        }
    }

    let notification = announce(state, &submission).await;

    Ok(PipelineResult {
        submission: Some(submission),
        duplicate,
        notification,
        spam: false,
    })
}

/// Outcome of a previous announcement for a resubmitted record, or `None`
/// when it has to be announced again.
async fn earlier_announcement(
    state: &SharedState,
    submission: &Submission,
) -> Option<NotificationStatus> {
    match state.queue.latest_for_submission(submission.id).await {
        Ok(Some(item)) if item.is_completed() => {
            tracing::info!("Submission {} already announced, skipping", submission.id);
            Some(NotificationStatus::Skipped)
        }
        Ok(Some(item)) if !item.is_exhausted() => {
            tracing::info!(
                "Submission {} already has notification {} pending",
                submission.id,
                item.id
            );
            Some(NotificationStatus::Queued)
        }
        Ok(_) => {
            tracing::info!("Submission {} was never announced, announcing now", submission.id);
            None
        }
        Err(e) => {
            tracing::error!(
                "Could not look up notification for submission {}: {e}",
                submission.id
            );
            Some(NotificationStatus::Failed)
        }
    }
}

/// Record the notification in the queue, then publish it inline. A failed
/// publish leaves the row for the retry worker.
async fn announce(state: &SharedState, submission: &Submission) -> NotificationStatus {
    let config = &state.config;
    let notification = notify::compose(
        &config.topic,
        &config.notify_subject,
        &config.notify_template,
        submission,
    );

    let queued = match state
        .queue
        .enqueue(&notification, config.notify_max_attempts.max(1))
        .await
    {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::error!(
                "Failed to queue notification for submission {}: {e}",
                submission.id
            );
            None
        }
    };

    match state.notifiers.deliver(&notification).await {
        Ok(()) => {
            if let Some(item) = queued {
                if let Err(e) = state.queue.mark_completed(item.id).await {
                    tracing::warn!("Failed to mark notification {} completed: {e}", item.id);
                }
            }
            NotificationStatus::Sent
        }
        Err(e) => {
            let Some(item) = queued else {
                tracing::error!(
                    "Notification for submission {} failed and could not be queued: {e}",
                    submission.id
                );
                return NotificationStatus::Failed;
            };

            tracing::warn!(
                "Notification for submission {} failed, queued for retry: {e}",
                submission.id
            );
            // An unreleased claim is picked up once it goes stale
            if let Err(qe) = state.queue.release(item.id, &e.message).await {
                tracing::warn!("Failed to release notification {}: {qe}", item.id);
            }
            NotificationStatus::Queued
        }
    }
}
