pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod submission;
pub mod views;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, StorageBackend};
use crate::db::{MemoryStore, NotificationQueue, PgStore, SubmissionStore};
use crate::notify::email::EmailNotifier;
use crate::notify::log::LogNotifier;
use crate::notify::webhook::WebhookNotifier;
use crate::notify::NotifierRegistry;
use crate::routes::list::NEXT_CURSOR_HEADER;
use crate::state::{AppState, SharedState};

/// Connect the configured store and notifiers.
pub async fn init_state(config: Config) -> Result<SharedState, String> {
    let notifiers = notifier_registry(&config)?;

    let (store, queue): (Arc<dyn SubmissionStore>, Arc<dyn NotificationQueue>) =
        match &config.storage {
            StorageBackend::Postgres { database_url } => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await
                    .map_err(|e| format!("Failed to connect to database: {e}"))?;

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| format!("Failed to run migrations: {e}"))?;
                tracing::info!("Migrations applied");

                split_store(Arc::new(PgStore::new(pool, config.table_name.clone())))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; submissions are lost on restart");
                split_store(Arc::new(MemoryStore::new()))
            }
        };

    Ok(Arc::new(AppState::new(config, store, queue, notifiers)))
}

fn split_store<S>(store: Arc<S>) -> (Arc<dyn SubmissionStore>, Arc<dyn NotificationQueue>)
where
    S: SubmissionStore + NotificationQueue + 'static,
{
    let submissions: Arc<dyn SubmissionStore> = store.clone();
    let queue: Arc<dyn NotificationQueue> = store;
    (submissions, queue)
}

/// Register every notifier that can be built from `config` and make sure the
/// configured topic has one.
pub fn notifier_registry(config: &Config) -> Result<NotifierRegistry, String> {
    let mut notifiers = NotifierRegistry::new();
    notifiers.register(Arc::new(LogNotifier));
    notifiers.register(Arc::new(WebhookNotifier::new()?));

    if let Some(smtp) = &config.smtp {
        match EmailNotifier::new(smtp) {
            Ok(notifier) => {
                tracing::info!("SMTP notifier configured");
                notifiers.register(Arc::new(notifier));
            }
            Err(e) => tracing::warn!("SMTP notifier not available: {e}"),
        }
    }

    if !notifiers.supports(&config.topic) {
        return Err(format!(
            "No notifier available for topic {} (is SMTP configured?)",
            config.topic
        ));
    }

    Ok(notifiers)
}

pub fn build_app(state: SharedState) -> Router {
    let config = &state.config;
    let max_body_size = config.max_body_size;

    let allow_origin = if config.cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(NEXT_CURSOR_HEADER)])
        .max_age(Duration::from_secs(86400));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    Router::new()
        .merge(routes::api_routes())
        .merge(views::view_routes())
        .nest_service("/static", ServeDir::new("static"))
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .layer(security_headers)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
