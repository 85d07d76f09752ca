//! Background polling of one task until it reaches a terminal status.
//!
//! A poller checks immediately, then keeps checking on a fixed interval
//! while the task is pending. Failed checks back off to a longer delay and
//! polling continues regardless of how many checks fail in a row. The loop
//! ends when the task is terminal, when it is no longer tracked, or when
//! its [`CancellationToken`] is triggered.

use std::sync::Arc;
use std::time::Duration;

use genproxy_core::error::CoreError;
use genproxy_core::task::Task;
use tokio_util::sync::CancellationToken;

use crate::api::GenerationProvider;
use crate::check::check_task;
use crate::store::TaskStore;

/// Default delay between checks of a pending task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default delay after a failed check.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(20);

/// Tunable delays for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub failure_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
        }
    }
}

/// How a single poll attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Terminal,
    Failed,
}

impl PollOutcome {
    fn from_check(result: &Result<Task, CoreError>) -> Self {
        match result {
            Ok(task) if task.status.is_terminal() => PollOutcome::Terminal,
            Ok(_) => PollOutcome::Pending,
            Err(_) => PollOutcome::Failed,
        }
    }
}

/// Delay before the next attempt, or `None` when polling should stop.
pub fn next_delay(outcome: PollOutcome, config: &PollerConfig) -> Option<Duration> {
    match outcome {
        PollOutcome::Pending => Some(config.interval),
        PollOutcome::Failed => Some(config.failure_backoff),
        PollOutcome::Terminal => None,
    }
}

/// Poll `task_id` until it is terminal or `cancel` is triggered.
///
/// Detaches its own handle from the store on exit.
pub async fn run_poller(
    store: Arc<TaskStore>,
    provider: Arc<dyn GenerationProvider>,
    task_id: String,
    config: PollerConfig,
    cancel: CancellationToken,
) {
    let mut delay = Duration::ZERO;
    let mut attempt = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(task_id = %task_id, attempt, "Poller cancelled");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match store.get(&task_id).await {
            None => {
                tracing::debug!(task_id = %task_id, "Task no longer tracked, poller exiting");
                break;
            }
            Some(task) if task.status.is_terminal() => {
                tracing::debug!(task_id = %task_id, status = %task.status, "Task already terminal");
                break;
            }
            Some(_) => {}
        }

        attempt += 1;
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(task_id = %task_id, attempt, "Poller cancelled during check");
                break;
            }
            result = check_task(&store, provider.as_ref(), &task_id) => result,
        };

        let outcome = PollOutcome::from_check(&result);
        match next_delay(outcome, &config) {
            Some(next) => {
                if let Err(e) = &result {
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        error = %e,
                        retry_in_ms = next.as_millis() as u64,
                        "Poll attempt failed, backing off",
                    );
                }
                delay = next;
            }
            None => {
                if let Ok(task) = &result {
                    tracing::info!(
                        task_id = %task_id,
                        attempt,
                        status = %task.status,
                        assets = task.result.len(),
                        "Task reached terminal status",
                    );
                }
                break;
            }
        }
    }

    store.take_poller(&task_id).await;
}
