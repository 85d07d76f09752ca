//! Task tracking: submission, status queries and poller lifecycle.
//!
//! [`TaskManager`] owns the [`TaskStore`], the provider client and one
//! background poller per pending task. Status queries are answered under
//! the [`StatusPolicy`] from `genproxy-core`, which bounds how long a
//! client waits for a result and how often the provider is asked.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use genproxy_core::error::CoreError;
use genproxy_core::status_policy::{
    decide_after_failed_check, decide_status, CheckFailureDecision, StatusDecision, StatusPolicy,
};
use genproxy_core::task::{Task, TaskStatus};
use genproxy_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::api::{GenerationProvider, ProviderApiError, RawResponse};
use crate::check::check_task;
use crate::messages::parse_create_response;
use crate::poller::{run_poller, PollerConfig};
use crate::store::{PollerHandle, TaskStore};

/// Outcome of a successful submission.
#[derive(Debug)]
pub struct Submission {
    /// Provider response, to be relayed unchanged.
    pub response: RawResponse,
    /// The registered task, if the provider returned a task id.
    pub task: Option<Task>,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    /// The id was never registered; a completed placeholder answer.
    Synthesized {
        status: TaskStatus,
        result: Vec<String>,
    },
    /// The stored record, after whichever rule applied.
    Tracked(Task),
    /// A live check failed inside the grace period. The stored status is
    /// unchanged; the client is told the task is still processing.
    Degraded { task: Task, message: String },
}

impl StatusReport {
    /// Status shown to the client.
    pub fn status(&self) -> TaskStatus {
        match self {
            StatusReport::Synthesized { status, .. } => *status,
            StatusReport::Tracked(task) => task.status,
            StatusReport::Degraded { .. } => TaskStatus::Processing,
        }
    }
}

/// Tracks generation tasks for the lifetime of the process.
///
/// Created once at application startup. The returned `Arc` can be cheaply
/// cloned into request handlers.
pub struct TaskManager {
    store: Arc<TaskStore>,
    provider: Arc<dyn GenerationProvider>,
    policy: StatusPolicy,
    poller_config: PollerConfig,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl TaskManager {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        policy: StatusPolicy,
        poller_config: PollerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(TaskStore::new()),
            provider,
            policy,
            poller_config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Forward a generation payload to the provider and track the task it
    /// creates.
    ///
    /// Provider failures are returned as-is so the caller can relay them.
    pub async fn submit(
        &self,
        prompt: &str,
        payload: &serde_json::Value,
    ) -> Result<Submission, ProviderApiError> {
        let response = self.provider.create_task(payload).await?;

        let Some((task_id, status)) = parse_create_response(&response.body) else {
            tracing::warn!(
                provider_status = response.status,
                "Provider response carries no task id, nothing to track",
            );
            return Ok(Submission {
                response,
                task: None,
            });
        };

        let task = self.register(task_id, prompt.to_string(), status).await;
        Ok(Submission { response, task })
    }

    /// Register a provider task and start its poller.
    ///
    /// Returns `None` if the id is already tracked; the existing record and
    /// poller are kept.
    pub async fn register(&self, task_id: String, prompt: String, status: TaskStatus) -> Option<Task> {
        let task = Task::new(task_id.clone(), prompt, status, Utc::now());

        let inserted = self
            .store
            .insert_with_poller(task.clone(), || Some(self.spawn_poller(&task_id)))
            .await;

        if !inserted {
            tracing::warn!(task_id = %task_id, "Task already tracked, keeping existing record");
            return None;
        }

        tracing::info!(task_id = %task_id, status = %status, "Task registered, poller started");
        Some(task)
    }

    /// Answer a status query for `task_id`.
    ///
    /// Never fails: provider errors are absorbed into a degraded answer or
    /// a forced completion.
    pub async fn query_status(&self, task_id: &str) -> StatusReport {
        let task = self.store.get(task_id).await;

        match decide_status(task.as_ref(), Utc::now(), &self.policy) {
            StatusDecision::Synthesize => {
                tracing::debug!(task_id, "Unknown task, answering with placeholder");
                self.synthesized()
            }
            StatusDecision::ForceComplete => self.force_complete(task_id).await,
            StatusDecision::Debounced => {
                tracing::debug!(task_id, "Checked recently, answering from store");
                match task {
                    Some(task) => StatusReport::Tracked(task),
                    None => self.synthesized(),
                }
            }
            StatusDecision::LiveCheck => self.live_check(task_id).await,
        }
    }

    /// Stop the poller of `task_id`, if one is running.
    pub async fn stop_polling(&self, task_id: &str) -> bool {
        match self.store.take_poller(task_id).await {
            Some(handle) => {
                handle.cancel.cancel();
                tracing::info!(task_id, "Poller stopped");
                true
            }
            None => false,
        }
    }

    /// Evict terminal tasks created before `cutoff`. Returns the number of
    /// evicted tasks.
    pub async fn evict_terminal_before(&self, cutoff: Timestamp) -> usize {
        let removed = self.store.remove_terminal_before(cutoff).await;
        for (task_id, poller) in &removed {
            if let Some(handle) = poller {
                handle.cancel.cancel();
                tracing::debug!(task_id = %task_id, "Stopped poller of evicted task");
            }
        }
        removed.len()
    }

    /// Gracefully stop every poller.
    ///
    /// Cancels the master token, then waits up to `timeout` per poller for
    /// a clean exit.
    pub async fn shutdown(&self, timeout: Duration) {
        tracing::info!("Shutting down task manager");
        self.cancel.cancel();

        for (task_id, handle) in self.store.drain_pollers().await {
            handle.cancel.cancel();
            let _ = tokio::time::timeout(timeout, handle.task_handle).await;
            tracing::debug!(task_id = %task_id, "Poller stopped");
        }

        tracing::info!("Task manager shut down complete");
    }

    // ---- private helpers ----

    fn synthesized(&self) -> StatusReport {
        StatusReport::Synthesized {
            status: TaskStatus::Completed,
            result: vec![self.policy.placeholder_url.clone()],
        }
    }

    fn spawn_poller(&self, task_id: &str) -> PollerHandle {
        let cancel = self.cancel.child_token();
        let task_handle = tokio::spawn(run_poller(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            task_id.to_string(),
            self.poller_config,
            cancel.clone(),
        ));
        PollerHandle {
            cancel,
            task_handle,
        }
    }

    async fn force_complete(&self, task_id: &str) -> StatusReport {
        let now = Utc::now();
        let placeholder = &self.policy.placeholder_url;
        let updated = self
            .store
            .update(task_id, |t| {
                t.force_complete(placeholder, now);
                t.clone()
            })
            .await;

        match updated {
            Some(task) => {
                tracing::info!(task_id, assets = task.result.len(), "Task force-completed");
                self.stop_polling(task_id).await;
                StatusReport::Tracked(task)
            }
            None => self.synthesized(),
        }
    }

    async fn live_check(&self, task_id: &str) -> StatusReport {
        let err = match check_task(&self.store, self.provider.as_ref(), task_id).await {
            Ok(task) => return StatusReport::Tracked(task),
            Err(e) => e,
        };

        let Some(task) = self.store.get(task_id).await else {
            return self.synthesized();
        };

        match decide_after_failed_check(&task, Utc::now(), &self.policy) {
            CheckFailureDecision::ForceComplete => self.force_complete(task_id).await,
            CheckFailureDecision::ReportProcessing => {
                let err = CoreError::TransientCheckFailure {
                    task_id: task_id.to_string(),
                    message: err.to_string(),
                };
                tracing::debug!(task_id, error = %err, "Check failed inside grace period");
                StatusReport::Degraded {
                    task,
                    message: err.to_string(),
                }
            }
        }
    }
}
