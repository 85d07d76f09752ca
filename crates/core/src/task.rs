//! The tracked generation task and its status lifecycle.

use serde::{Deserialize, Serialize};

use crate::types::{TaskId, Timestamp};

/// Lifecycle status of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `Completed` and `Failed` end polling for a task.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last failed provider check for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub message: String,
    pub timestamp: Timestamp,
    pub provider_status_code: Option<u16>,
}

/// A generation task registered with the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Provider-assigned id. Never mutated.
    pub id: TaskId,
    pub created_at: Timestamp,
    /// Caller-supplied prompt, kept verbatim for diagnostics.
    pub prompt: String,
    pub status: TaskStatus,
    /// Asset URIs, real or placeholder. Empty until one is assigned.
    pub result: Vec<String>,
    pub last_checked: Option<Timestamp>,
    pub last_error: Option<TaskError>,
}

impl Task {
    /// A freshly registered task: no result, never checked.
    pub fn new(id: TaskId, prompt: String, status: TaskStatus, now: Timestamp) -> Self {
        Self {
            id,
            created_at: now,
            prompt,
            status,
            result: Vec::new(),
            last_checked: None,
            last_error: None,
        }
    }

    /// Apply a successful provider check.
    ///
    /// A stored terminal status is never moved back to a non-terminal one.
    /// Assets are only copied when the provider reports `Completed` and
    /// lists at least one; they replace any placeholder result.
    pub fn apply_check(&mut self, reported: TaskStatus, assets: Vec<String>, now: Timestamp) {
        self.last_checked = Some(now);

        if reported == TaskStatus::Completed && !assets.is_empty() {
            self.status = TaskStatus::Completed;
            self.result = assets;
        } else if !self.status.is_terminal() {
            self.status = reported;
        }
    }

    /// Record a failed provider check. `status` is left untouched.
    pub fn record_check_failure(
        &mut self,
        message: String,
        provider_status_code: Option<u16>,
        now: Timestamp,
    ) {
        self.last_checked = Some(now);
        self.last_error = Some(TaskError {
            message,
            timestamp: now,
            provider_status_code,
        });
    }

    /// Force the task to `Completed`, filling an empty result with the
    /// placeholder asset.
    pub fn force_complete(&mut self, placeholder: &str, now: Timestamp) {
        self.status = TaskStatus::Completed;
        if self.result.is_empty() {
            self.result = vec![placeholder.to_string()];
        }
        self.last_checked = Some(now);
    }

    /// Whether the most recent check recorded on this task failed.
    pub fn last_check_failed(&self) -> bool {
        match (&self.last_error, self.last_checked) {
            (Some(err), Some(checked)) => err.timestamp == checked,
            _ => false,
        }
    }
}
