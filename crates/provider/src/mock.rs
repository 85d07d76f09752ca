//! Scripted in-memory provider for tests.
//!
//! Compiled for this crate's unit tests and, through the `test-util`
//! feature, for downstream integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{GenerationProvider, ProviderApiError, RawResponse};
use crate::messages::{GeneratedAsset, TaskStatusResponse};

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum ScriptedCheck {
    Status(&'static str),
    Completed(Vec<&'static str>),
    Fail(u16),
}

/// Scripted answer to task creation.
#[derive(Debug, Clone)]
struct ScriptedCreate {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// Answers status checks from a script; the last entry repeats once the
/// script runs out. An empty script answers `PROCESSING`.
///
/// Task creation answers `{"taskId":"t1","status":"CREATED"}` with 200
/// unless configured otherwise; a non-2xx status is returned as
/// [`ProviderApiError::ApiError`].
pub struct ScriptedProvider {
    checks: Mutex<VecDeque<ScriptedCheck>>,
    create: ScriptedCreate,
    delay: Duration,
    check_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(checks: Vec<ScriptedCheck>) -> Self {
        Self {
            checks: Mutex::new(checks.into()),
            create: ScriptedCreate {
                status: 200,
                content_type: Some("application/json".into()),
                body: br#"{"taskId":"t1","status":"CREATED"}"#.to_vec(),
            },
            delay: Duration::ZERO,
            check_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    /// Answer task creation with `body` as JSON.
    pub fn with_create(self, status: u16, body: serde_json::Value) -> Self {
        let body = serde_json::to_vec(&body).unwrap_or_default();
        self.with_create_raw(status, Some("application/json"), body)
    }

    /// Answer task creation with an arbitrary body and content type.
    pub fn with_create_raw(
        mut self,
        status: u16,
        content_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.create = ScriptedCreate {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        };
        self
    }

    /// Delay every status check by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace whatever is left of the check script.
    pub fn script(&self, checks: Vec<ScriptedCheck>) {
        *self.lock_checks() = checks.into();
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn lock_checks(&self) -> std::sync::MutexGuard<'_, VecDeque<ScriptedCheck>> {
        self.checks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_check(&self) -> ScriptedCheck {
        let mut checks = self.lock_checks();
        if checks.len() > 1 {
            if let Some(next) = checks.pop_front() {
                return next;
            }
        }
        checks
            .front()
            .cloned()
            .unwrap_or(ScriptedCheck::Status("PROCESSING"))
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn create_task(&self, _payload: &serde_json::Value) -> Result<RawResponse, ProviderApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let ScriptedCreate {
            status,
            content_type,
            body,
        } = self.create.clone();
        if !(200..300).contains(&status) {
            return Err(ProviderApiError::ApiError {
                status,
                content_type,
                body,
            });
        }
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    async fn check_status(&self, _task_id: &str) -> Result<TaskStatusResponse, ProviderApiError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.next_check();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match next {
            ScriptedCheck::Status(status) => Ok(TaskStatusResponse::new(status, Vec::new())),
            ScriptedCheck::Completed(urls) => Ok(TaskStatusResponse::new(
                "COMPLETED",
                urls.into_iter()
                    .map(|u| GeneratedAsset::Url(u.to_string()))
                    .collect(),
            )),
            ScriptedCheck::Fail(status) => {
                Err(ProviderApiError::api(status, format!("scripted failure {status}")))
            }
        }
    }
}
