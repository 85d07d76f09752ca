//! Handlers for image generation: submission and task status.
//!
//! Submission relays the provider's answer verbatim. Status queries never
//! fail: every outcome, including provider errors, is answered with 200.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use genproxy_core::error::CoreError;
use genproxy_core::task::{Task, TaskStatus};
use genproxy_provider::api::RawResponse;
use genproxy_provider::manager::StatusReport;
use serde::Serialize;

use crate::error::{raw_response, AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Response body of `GET /task/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<String>>,
    /// Failure message of a live check that could not be completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

impl From<StatusReport> for TaskStatusResponse {
    fn from(report: StatusReport) -> Self {
        match report {
            StatusReport::Synthesized { status, result } => Self {
                status,
                result: Some(result),
                error: None,
                task: None,
            },
            StatusReport::Tracked(task) => Self {
                status: task.status,
                result: (!task.result.is_empty()).then(|| task.result.clone()),
                error: None,
                task: Some(task),
            },
            StatusReport::Degraded { task, message } => Self {
                status: TaskStatus::Processing,
                result: None,
                error: Some(message),
                task: Some(task),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// POST /generate
///
/// Forward the payload to the provider unchanged and relay its answer.
/// When the provider returns a task id, the task is registered and polled
/// in the background.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<Response> {
    let prompt = payload
        .get("prompt")
        .and_then(serde_json::Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "prompt is required and must be a non-empty string".to_string(),
            ))
        })?;

    let submission = state.task_manager.submit(prompt, &payload).await?;

    match &submission.task {
        Some(task) => tracing::info!(
            task_id = %task.id,
            status = %task.status,
            provider_status = submission.response.status,
            "Generation submitted",
        ),
        None => tracing::info!(
            provider_status = submission.response.status,
            "Generation submitted without a trackable task id",
        ),
    }

    Ok(relay(submission.response))
}

/// Rebuild the provider response for the caller.
fn relay(response: RawResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    raw_response(status, response.content_type.as_deref(), response.body)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /task/{id}
///
/// Answer under the status policy. Always 200.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Json<TaskStatusResponse> {
    let report = state.task_manager.query_status(&task_id).await;
    Json(report.into())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn synthesized_report_has_no_task() {
        let response: TaskStatusResponse = StatusReport::Synthesized {
            status: TaskStatus::Completed,
            result: vec!["https://example.test/p.png".into()],
        }
        .into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["result"][0], "https://example.test/p.png");
        assert!(json.get("task").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn tracked_report_without_result_omits_it() {
        let task = Task::new("t1".into(), "a cat".into(), TaskStatus::Processing, Utc::now());
        let json = serde_json::to_value(TaskStatusResponse::from(StatusReport::Tracked(task))).unwrap();

        assert_eq!(json["status"], "PROCESSING");
        assert!(json.get("result").is_none());
        assert_eq!(json["task"]["id"], "t1");
        assert_eq!(json["task"]["prompt"], "a cat");
    }

    #[test]
    fn degraded_report_is_processing_with_error() {
        let task = Task::new("t1".into(), "a cat".into(), TaskStatus::Created, Utc::now());
        let json = serde_json::to_value(TaskStatusResponse::from(StatusReport::Degraded {
            task,
            message: "Provider unavailable: timeout".into(),
        }))
        .unwrap();

        assert_eq!(json["status"], "PROCESSING");
        assert_eq!(json["error"], "Provider unavailable: timeout");
        assert_eq!(json["task"]["status"], "CREATED");
    }
}
