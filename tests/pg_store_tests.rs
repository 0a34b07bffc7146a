mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use formdrop::db::{MemoryStore, NotificationQueue, PgStore, PutOutcome, SubmissionStore};
use formdrop::models::{Notification, Submission};
use formdrop::worker;

fn record(name: &str) -> Submission {
    Submission {
        id: Uuid::now_v7(),
        name: name.to_string(),
        age: "30".to_string(),
        profession: "Engineer".to_string(),
        experience: "5".to_string(),
        timestamp: Utc::now(),
    }
}

fn notification() -> Notification {
    Notification {
        submission_id: Uuid::now_v7(),
        topic: "log:submissions".to_string(),
        subject: "New Form Submission".to_string(),
        message: "Name: Ann".to_string(),
    }
}

// ── Submissions ─────────────────────────────────────────────────

#[tokio::test]
async fn put_same_id_keeps_first_record() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };

    let first = record("Ann");
    let mut second = first.clone();
    second.name = "Changed".to_string();

    let PutOutcome::Created(created) = store.put(&first).await.unwrap() else {
        panic!("first put should create");
    };
    assert_eq!(created.id, first.id);
    assert_eq!(created.name, "Ann");

    let PutOutcome::Existing(existing) = store.put(&second).await.unwrap() else {
        panic!("second put should find the existing record");
    };
    assert_eq!(existing.id, first.id);
    assert_eq!(existing.name, "Ann");
    assert_eq!(existing.timestamp, created.timestamp);

    assert_eq!(store.scan_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn collections_do_not_share_records() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };
    let other = PgStore::new(store.pool().clone(), "archive");

    let shared = record("Ann");
    assert!(matches!(store.put(&shared).await.unwrap(), PutOutcome::Created(_)));
    assert!(matches!(other.put(&shared).await.unwrap(), PutOutcome::Created(_)));
    other.put(&record("Bo")).await.unwrap();

    assert_eq!(store.scan_all().await.unwrap().len(), 1);
    assert_eq!(other.scan_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn scan_pages_by_id_with_cursor() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };

    for i in 0..7 {
        store.put(&record(&format!("user-{i}"))).await.unwrap();
    }

    let mut ids = Vec::new();
    let mut sizes = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.scan(cursor, 3).await.unwrap();
        sizes.push(page.items.len());
        ids.extend(page.items.iter().map(|s| s.id));
        match page.next_cursor {
            Some(next) => {
                assert_eq!(Some(&next), ids.last());
                cursor = Some(next);
            }
            None => break,
        }
    }

    assert_eq!(sizes, [3, 3, 1]);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 7);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let exact = store.scan(None, 7).await.unwrap();
    assert_eq!(exact.items.len(), 7);
    assert!(exact.next_cursor.is_none());
}

// ── Notification queue ──────────────────────────────────────────

#[tokio::test]
async fn released_item_is_claimed_then_backed_off() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };
    let n = notification();

    let item = store.enqueue(&n, 3).await.unwrap();
    assert_eq!(item.status, "processing");
    assert_eq!(item.attempts, 0);
    assert_eq!(item.max_attempts, 3);
    assert!(store.claim_next().await.unwrap().is_none());

    store.release(item.id, "offline").await.unwrap();
    let claimed = store.claim_next().await.unwrap().unwrap();
    assert_eq!(claimed.id, item.id);
    assert_eq!(claimed.attempts, 1);
    assert_eq!(claimed.last_error.as_deref(), Some("offline"));
    assert!(store.claim_next().await.unwrap().is_none());

    store
        .mark_failed(claimed.id, claimed.attempts, claimed.max_attempts, "boom")
        .await
        .unwrap();
    let failed = store.latest_for_submission(n.submission_id).await.unwrap().unwrap();
    assert_eq!(failed.status, "failed");
    assert!(!failed.is_exhausted());
    assert!(failed.next_retry_at > Utc::now() + chrono::Duration::milliseconds(500));
    assert!(store.claim_next().await.unwrap().is_none());

    store.mark_completed(failed.id).await.unwrap();
    let done = store.latest_for_submission(n.submission_id).await.unwrap().unwrap();
    assert!(done.is_completed());
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn last_attempt_failure_is_final() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };

    let item = store.enqueue(&notification(), 1).await.unwrap();
    store.release(item.id, "offline").await.unwrap();
    let claimed = store.claim_next().await.unwrap().unwrap();
    store.mark_failed(claimed.id, 1, 1, "still offline").await.unwrap();

    let row = store
        .latest_for_submission(item.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_exhausted());
    assert!(store.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn abandoned_claim_is_reclaimed() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };

    let item = store.enqueue(&notification(), 3).await.unwrap();
    assert!(store.claim_next().await.unwrap().is_none());

    sqlx::query(
        "UPDATE notification_queue SET claimed_at = now() - interval '10 minutes' WHERE id = $1",
    )
    .bind(item.id)
    .execute(store.pool())
    .await
    .unwrap();

    let claimed = store.claim_next().await.unwrap().unwrap();
    assert_eq!(claimed.id, item.id);
    assert_eq!(claimed.attempts, 1);
}

#[tokio::test]
async fn latest_for_submission_picks_newest_row() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };
    let n = notification();

    assert!(store.latest_for_submission(n.submission_id).await.unwrap().is_none());
    let first = store.enqueue(&n, 1).await.unwrap();
    store.mark_failed(first.id, 1, 1, "gone").await.unwrap();
    let second = store.enqueue(&n, 1).await.unwrap();

    let latest = store.latest_for_submission(n.submission_id).await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
}

// ── Through the API ─────────────────────────────────────────────

#[tokio::test]
async fn submit_list_and_retry_on_postgres() {
    let Some(store) = common::pg_store("submissions").await else {
        return;
    };
    let store = Arc::new(store);
    let app = common::spawn_custom(
        common::test_config(),
        Arc::new(MemoryStore::new()),
        store.clone(),
        store,
    )
    .await;
    app.notifier.set_failing(true);

    let id = Uuid::now_v7().to_string();
    let submission = json!({
        "id": id,
        "name": "Ann",
        "age": "30",
        "profession": "Engineer",
        "experience": "5"
    });

    let (body, status) = app.submit_json(&submission).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"], "queued");

    let (body, status) = app.submit_json(&submission).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], true);
    assert_eq!(body["notification"], "queued");

    app.notifier.set_failing(false);
    assert!(worker::process_next(&app.state).await.unwrap());
    assert_eq!(app.notifier.published().len(), 1);

    let (body, _) = app.submit_json(&submission).await;
    assert_eq!(body["notification"], "skipped");
    assert_eq!(app.notifier.published().len(), 1);

    let (list, status) = app.get_json("/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id.as_str());
}
