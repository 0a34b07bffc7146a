use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::{NotificationQueue, SubmissionStore};
use crate::notify::NotifierRegistry;
use crate::rate_limit::SubmissionRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SubmissionStore>,
    pub queue: Arc<dyn NotificationQueue>,
    pub notifiers: NotifierRegistry,
    pub submission_limiter: SubmissionRateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SubmissionStore>,
        queue: Arc<dyn NotificationQueue>,
        notifiers: NotifierRegistry,
    ) -> Self {
        let submission_limiter = SubmissionRateLimiter::new(
            config.rate_limit,
            Duration::from_secs(config.rate_limit_window_secs.max(1)),
        );

        Self {
            config,
            store,
            queue,
            notifiers,
            submission_limiter,
        }
    }
}
