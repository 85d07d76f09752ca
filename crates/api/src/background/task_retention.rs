//! Periodic eviction of finished tasks.
//!
//! Only spawned when `TASK_RETENTION_SECS` is set. Tasks in a terminal
//! status whose creation is older than the retention period are dropped
//! from the registry; pending tasks are never evicted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use genproxy_provider::manager::TaskManager;
use tokio_util::sync::CancellationToken;

/// Run one eviction pass. Returns the number of evicted tasks.
pub async fn sweep(task_manager: &TaskManager, retention: Duration) -> usize {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(retention)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    task_manager.evict_terminal_before(cutoff).await
}

/// Run the task retention loop.
///
/// Evicts terminal tasks older than `retention` every `sweep_interval`.
/// Runs until `cancel` is triggered.
pub async fn run(
    task_manager: Arc<TaskManager>,
    retention: Duration,
    sweep_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = sweep_interval.as_secs(),
        "Task retention job started"
    );

    // `interval` panics on a zero period.
    let mut interval = tokio::time::interval(sweep_interval.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Task retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = sweep(&task_manager, retention).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Task retention: evicted finished tasks");
                } else {
                    tracing::debug!("Task retention: nothing to evict");
                }
            }
        }
    }
}
