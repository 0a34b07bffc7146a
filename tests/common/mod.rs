#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use formdrop::config::{Config, StorageBackend, DEFAULT_NOTIFY_SUBJECT, DEFAULT_NOTIFY_TEMPLATE};
use formdrop::db::{
    MemoryStore, NotificationQueue, Page, PgStore, PutOutcome, StoreError, SubmissionStore,
};
use formdrop::models::{Notification, QueuedNotification, Submission};
use formdrop::notify::log::LogNotifier;
use formdrop::notify::webhook::WebhookNotifier;
use formdrop::notify::{Notifier, NotifierRegistry, NotifyError, Topic};
use formdrop::state::{AppState, SharedState};

/// One successful publish seen by the recording notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub subject: String,
    pub message: String,
}

/// Notifier for `test:` topics that remembers what it delivered and can be
/// switched into failure mode.
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Published>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn schemes(&self) -> &[&'static str] {
        &["test"]
    }

    fn name(&self) -> &str {
        "Recording"
    }

    async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::from("recording notifier is failing"));
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Store and queue whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl SubmissionStore for FailingStore {
    async fn put(&self, _submission: &Submission) -> Result<PutOutcome, StoreError> {
        Err(StoreError::Unavailable("simulated write failure".to_string()))
    }

    async fn scan(&self, _after: Option<Uuid>, _limit: usize) -> Result<Page, StoreError> {
        Err(StoreError::Unavailable("simulated scan failure".to_string()))
    }
}

#[async_trait]
impl NotificationQueue for FailingStore {
    async fn enqueue(
        &self,
        _notification: &Notification,
        _max_attempts: i32,
    ) -> Result<QueuedNotification, StoreError> {
        Err(StoreError::Unavailable("simulated enqueue failure".to_string()))
    }

    async fn release(&self, _id: Uuid, _error: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("simulated update failure".to_string()))
    }

    async fn claim_next(&self) -> Result<Option<QueuedNotification>, StoreError> {
        Err(StoreError::Unavailable("simulated claim failure".to_string()))
    }

    async fn mark_completed(&self, _id: Uuid) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("simulated update failure".to_string()))
    }

    async fn mark_failed(
        &self,
        _id: Uuid,
        _attempts: i32,
        _max_attempts: i32,
        _error: &str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("simulated update failure".to_string()))
    }

    async fn latest_for_submission(
        &self,
        _submission_id: Uuid,
    ) -> Result<Option<QueuedNotification>, StoreError> {
        Err(StoreError::Unavailable("simulated lookup failure".to_string()))
    }
}

/// Queue backed by a `MemoryStore` that can be switched into failure mode.
pub struct FlakyQueue {
    inner: Arc<MemoryStore>,
    failing: AtomicBool,
}

impl FlakyQueue {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("queue is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationQueue for FlakyQueue {
    async fn enqueue(
        &self,
        notification: &Notification,
        max_attempts: i32,
    ) -> Result<QueuedNotification, StoreError> {
        self.check()?;
        self.inner.enqueue(notification, max_attempts).await
    }

    async fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.release(id, error).await
    }

    async fn claim_next(&self) -> Result<Option<QueuedNotification>, StoreError> {
        self.check()?;
        self.inner.claim_next().await
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.inner.mark_completed(id).await
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        max_attempts: i32,
        error: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner.mark_failed(id, attempts, max_attempts, error).await
    }

    async fn latest_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<QueuedNotification>, StoreError> {
        self.check()?;
        self.inner.latest_for_submission(submission_id).await
    }
}

/// A running test server instance backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Submit data as JSON, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/submit"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit a complete record for `name`.
    pub async fn submit_person(&self, name: &str) -> (Value, StatusCode) {
        self.submit_json(&json!({
            "name": name,
            "age": "30",
            "profession": "Engineer",
            "experience": "5"
        }))
        .await
    }

    /// GET a path and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub fn test_config() -> Config {
    Config {
        storage: StorageBackend::Memory,
        table_name: "submissions".to_string(),
        topic: "test:submissions".parse().unwrap(),
        api_base: String::new(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 65_536,
        trusted_proxies: vec![],
        cors_origins: vec![],
        rate_limit: 1_000,
        rate_limit_window_secs: 60,
        honeypot_field: None,
        redirect_url: None,
        list_page_size: 100,
        list_max_page_size: 1_000,
        notify_subject: DEFAULT_NOTIFY_SUBJECT.to_string(),
        notify_template: DEFAULT_NOTIFY_TEMPLATE.to_string(),
        notify_max_attempts: 3,
        worker_count: 1,
        log_level: "warn".to_string(),
        smtp: None,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    spawn_custom(config, store.clone(), store.clone(), store).await
}

/// Spawn with explicit collaborators. `memory` is what `TestApp::store`
/// exposes for inspection; it need not be the store the app writes to.
pub async fn spawn_custom(
    config: Config,
    memory: Arc<MemoryStore>,
    store: Arc<dyn SubmissionStore>,
    queue: Arc<dyn NotificationQueue>,
) -> TestApp {
    let notifier = Arc::new(RecordingNotifier::default());

    let mut notifiers = NotifierRegistry::new();
    notifiers.register(Arc::new(LogNotifier));
    notifiers.register(Arc::new(WebhookNotifier::new().unwrap()));
    notifiers.register(notifier.clone());

    let state: SharedState = Arc::new(AppState::new(config, store, queue, notifiers));
    let app = formdrop::build_app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        state,
        store: memory,
        notifier,
        client,
    }
}

/// Serve an arbitrary router on a random port, for stubbing remote services.
pub async fn serve_stub(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Stub failed");
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A `PgStore` on a fresh, migrated database, or `None` when `DATABASE_URL`
/// is not set.
pub async fn pg_store(collection: &str) -> Option<PgStore> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let db_name = format!("formdrop_test_{}", Uuid::now_v7().simple());

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(PgStore::new(pool, collection))
}
