use tokio::sync::watch;

use crate::state::SharedState;

/// Start the notification retry pool on a dedicated Tokio runtime with its own
/// thread pool. Runs on a separate OS thread until shutdown is signaled.
pub fn run_pool(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
    worker_count: usize,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let worker_count = worker_count.max(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_count)
        .thread_name("notify-worker")
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("worker-pool".into())
        .spawn(move || {
            runtime.block_on(async {
                let mut handles = Vec::with_capacity(worker_count);

                for id in 0..worker_count {
                    handles.push(tokio::spawn(run(id, state.clone(), shutdown.clone())));
                }

                tracing::info!("Notification worker pool started ({worker_count} workers)");

                for handle in handles {
                    let _ = handle.await;
                }

                tracing::info!("Notification worker pool stopped");
            });
        })
}

/// A single worker loop that polls the queue and processes items.
async fn run(id: usize, state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Worker {id} started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match process_next(&state).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Worker {id} error: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Worker {id} stopped");
}

/// Try to claim and deliver the next queued notification. Returns true if an
/// item was processed, whatever its outcome.
pub async fn process_next(state: &SharedState) -> Result<bool, String> {
    let item = state
        .queue
        .claim_next()
        .await
        .map_err(|e| format!("Failed to claim queue item: {e}"))?;

    let Some(item) = item else {
        return Ok(false);
    };

    tracing::debug!(
        "Processing queued notification {} (submission={}, attempt={})",
        item.id,
        item.submission_id,
        item.attempts
    );

    let delivery = match item.topic.parse() {
        Ok(topic) => {
            state
                .notifiers
                .publish(&topic, &item.subject, &item.message)
                .await
        }
        Err(e) => Err(format!("Invalid topic '{}': {e}", item.topic).into()),
    };

    match delivery {
        Ok(()) => {
            tracing::info!(
                "Delivered queued notification for submission {}",
                item.submission_id
            );
            state
                .queue
                .mark_completed(item.id)
                .await
                .map_err(|e| format!("Failed to mark {} completed: {e}", item.id))?;
        }
        Err(e) => {
            if item.attempts >= item.max_attempts {
                tracing::error!(
                    "Giving up on notification {} after {} attempts: {e}",
                    item.id,
                    item.attempts
                );
            } else {
                tracing::warn!("Notification {} attempt {} failed: {e}", item.id, item.attempts);
            }
            state
                .queue
                .mark_failed(item.id, item.attempts, item.max_attempts, &e.message)
                .await
                .map_err(|e| format!("Failed to mark {} failed: {e}", item.id))?;
        }
    }

    Ok(true)
}
