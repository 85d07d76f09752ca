//! Provider wire types and status mapping.
//!
//! The provider answers task creation with `{"taskId": ..., "status": ...}`
//! and status checks with `{"status": ..., "generatedAssets": [...]}`.
//! Some deployments use snake_case or shorter field names; every spelling
//! is accepted, even when a body carries more than one.

use genproxy_core::task::TaskStatus;
use serde::Deserialize;

/// Body of a successful task-creation response.
///
/// Each id spelling is read on its own so a body carrying several of them
/// still parses; [`CreateTaskResponse::task_id`] picks one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(default, rename = "taskId")]
    task_id_camel: Option<serde_json::Value>,
    #[serde(default, rename = "task_id")]
    task_id_snake: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateTaskResponse {
    /// The provider task id, preferring `taskId`, then `task_id`, then `id`.
    ///
    /// Numeric ids are accepted and rendered as strings. Blank or
    /// non-scalar values are skipped.
    pub fn task_id(&self) -> Option<String> {
        [&self.task_id_camel, &self.task_id_snake, &self.id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Body of a status-check response.
///
/// Assets may be listed under `generatedAssets`, `generated_assets` or
/// `assets`; the first spelling present wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    pub status: String,
    #[serde(default, rename = "generatedAssets")]
    assets_camel: Option<Vec<GeneratedAsset>>,
    #[serde(default, rename = "generated_assets")]
    assets_snake: Option<Vec<GeneratedAsset>>,
    #[serde(default)]
    assets: Option<Vec<GeneratedAsset>>,
}

/// One generated asset, listed either as a bare URI or as `{"url": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GeneratedAsset {
    Url(String),
    Object { url: String },
}

impl GeneratedAsset {
    pub fn url(&self) -> &str {
        match self {
            GeneratedAsset::Url(url) | GeneratedAsset::Object { url } => url,
        }
    }
}

impl TaskStatusResponse {
    pub fn new(status: impl Into<String>, assets: Vec<GeneratedAsset>) -> Self {
        Self {
            status: status.into(),
            assets_camel: Some(assets),
            ..Default::default()
        }
    }

    /// Listed assets, taken from the first asset field present.
    pub fn generated_assets(&self) -> &[GeneratedAsset] {
        [&self.assets_camel, &self.assets_snake, &self.assets]
            .into_iter()
            .flatten()
            .next()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The provider status mapped onto [`TaskStatus`].
    pub fn mapped_status(&self) -> TaskStatus {
        map_provider_status(&self.status)
    }

    /// Asset URIs in provider order, skipping empty entries.
    pub fn asset_urls(&self) -> Vec<String> {
        self.generated_assets()
            .iter()
            .map(GeneratedAsset::url)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Extract the task id and status from a creation response body.
///
/// Returns `None` when the body is not JSON or carries no usable id; the
/// response is still relayed to the caller in that case.
pub fn parse_create_response(body: &[u8]) -> Option<(String, TaskStatus)> {
    let parsed: CreateTaskResponse = serde_json::from_slice(body).ok()?;
    let task_id = parsed.task_id()?;
    let status = parsed
        .status
        .as_deref()
        .map(map_provider_status)
        .unwrap_or(TaskStatus::Created);
    Some((task_id, status))
}

/// Map a provider status string onto [`TaskStatus`] (case-insensitive).
///
/// Unrecognised values are treated as still processing so that polling
/// continues.
pub fn map_provider_status(raw: &str) -> TaskStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "created" | "pending" | "queued" | "submitted" => TaskStatus::Created,
        "processing" | "running" | "in_progress" | "started" => TaskStatus::Processing,
        "completed" | "complete" | "succeeded" | "success" | "done" | "finished" => {
            TaskStatus::Completed
        }
        "failed" | "error" | "cancelled" | "canceled" | "timeout" => TaskStatus::Failed,
        other => {
            tracing::debug!(status = other, "Unrecognised provider status, treating as processing");
            TaskStatus::Processing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_provider_status("CREATED"), TaskStatus::Created);
        assert_eq!(map_provider_status("queued"), TaskStatus::Created);
        assert_eq!(map_provider_status("PROCESSING"), TaskStatus::Processing);
        assert_eq!(map_provider_status("in_progress"), TaskStatus::Processing);
        assert_eq!(map_provider_status("COMPLETED"), TaskStatus::Completed);
        assert_eq!(map_provider_status("Succeeded"), TaskStatus::Completed);
        assert_eq!(map_provider_status("FAILED"), TaskStatus::Failed);
        assert_eq!(map_provider_status("cancelled"), TaskStatus::Failed);
    }

    #[test]
    fn unknown_status_keeps_processing() {
        assert_eq!(map_provider_status("warming_up"), TaskStatus::Processing);
    }

    #[test]
    fn parse_create_response_reads_camel_case() {
        let body = br#"{"taskId":"t1","status":"CREATED"}"#;
        assert_eq!(
            parse_create_response(body),
            Some(("t1".to_string(), TaskStatus::Created))
        );
    }

    #[test]
    fn parse_create_response_defaults_status() {
        let body = br#"{"task_id":"t2"}"#;
        assert_eq!(
            parse_create_response(body),
            Some(("t2".to_string(), TaskStatus::Created))
        );
    }

    #[test]
    fn parse_create_response_without_id() {
        assert_eq!(parse_create_response(br#"{"status":"CREATED"}"#), None);
        assert_eq!(parse_create_response(br#"{"taskId":"  "}"#), None);
        assert_eq!(parse_create_response(b"queued"), None);
    }

    #[test]
    fn parse_create_response_with_several_id_fields() {
        let body = br#"{"id":"req_9","taskId":"t1","status":"CREATED"}"#;
        assert_eq!(
            parse_create_response(body),
            Some(("t1".to_string(), TaskStatus::Created))
        );

        let body = br#"{"id":"req_9","task_id":"t2","status":"RUNNING"}"#;
        assert_eq!(
            parse_create_response(body),
            Some(("t2".to_string(), TaskStatus::Processing))
        );
    }

    #[test]
    fn parse_create_response_falls_back_past_blank_id() {
        let body = br#"{"taskId":"","id":42}"#;
        assert_eq!(
            parse_create_response(body),
            Some(("42".to_string(), TaskStatus::Created))
        );
    }

    #[test]
    fn status_response_with_several_asset_fields() {
        let body = r#"{
            "status": "COMPLETED",
            "generatedAssets": ["https://cdn.test/a.png"],
            "assets": ["https://cdn.test/other.png"]
        }"#;
        let parsed: TaskStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.asset_urls(), vec!["https://cdn.test/a.png".to_string()]);

        let body = r#"{"status": "COMPLETED", "assets": [{"url": "https://cdn.test/c.png"}]}"#;
        let parsed: TaskStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.asset_urls(), vec!["https://cdn.test/c.png".to_string()]);
    }

    #[test]
    fn status_response_accepts_both_asset_shapes() {
        let body = r#"{
            "status": "COMPLETED",
            "generatedAssets": ["https://cdn.test/a.png", {"url": "https://cdn.test/b.png"}, ""]
        }"#;
        let parsed: TaskStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.mapped_status(), TaskStatus::Completed);
        assert_eq!(
            parsed.asset_urls(),
            vec![
                "https://cdn.test/a.png".to_string(),
                "https://cdn.test/b.png".to_string()
            ]
        );
    }

    #[test]
    fn status_response_without_assets() {
        let parsed: TaskStatusResponse =
            serde_json::from_str(r#"{"status":"PROCESSING"}"#).unwrap();
        assert!(parsed.asset_urls().is_empty());
    }
}
