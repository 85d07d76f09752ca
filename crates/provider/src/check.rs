//! Live provider checks with per-task single-flight.
//!
//! Only one provider call per task is in flight at a time. A caller that
//! had to wait for another caller's check reuses that outcome instead of
//! asking the provider again.

use chrono::Utc;
use genproxy_core::error::CoreError;
use genproxy_core::task::Task;

use crate::api::GenerationProvider;
use crate::store::TaskStore;

/// Check `task_id` against the provider and persist the outcome.
///
/// `last_checked` is updated on success and on failure. A failure also
/// records `last_error` on the task before the error is returned.
pub async fn check_task(
    store: &TaskStore,
    provider: &dyn GenerationProvider,
    task_id: &str,
) -> Result<Task, CoreError> {
    let lock = store
        .check_lock(task_id)
        .await
        .ok_or_else(|| CoreError::UnknownTask(task_id.to_string()))?;

    let requested_at = Utc::now();
    let _guard = lock.lock().await;

    let current = store
        .get(task_id)
        .await
        .ok_or_else(|| CoreError::UnknownTask(task_id.to_string()))?;

    // Another check finished while this one waited for the lock.
    if current.last_checked.is_some_and(|checked| checked >= requested_at) {
        tracing::debug!(task_id, "Reusing concurrent status check");
        return match &current.last_error {
            Some(err) if current.last_check_failed() => Err(CoreError::from_task_error(err)),
            _ => Ok(current),
        };
    }

    match provider.check_status(task_id).await {
        Ok(response) => {
            let reported = response.mapped_status();
            let assets = response.asset_urls();
            let now = Utc::now();

            let task = store
                .update(task_id, |t| {
                    t.apply_check(reported, assets, now);
                    t.clone()
                })
                .await
                .ok_or_else(|| CoreError::UnknownTask(task_id.to_string()))?;

            tracing::debug!(
                task_id,
                reported = %reported,
                status = %task.status,
                assets = task.result.len(),
                "Provider status checked",
            );
            Ok(task)
        }
        Err(e) => {
            let provider_status = e.status_code();
            let message = e.to_string();
            let now = Utc::now();

            store
                .update(task_id, |t| {
                    t.record_check_failure(message.clone(), provider_status, now)
                })
                .await;

            tracing::warn!(
                task_id,
                provider_status,
                error = %message,
                "Provider status check failed",
            );
            Err(e.into())
        }
    }
}
