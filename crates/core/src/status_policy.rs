//! Status query policy: which answer a client gets for a task id.
//!
//! The rules bound how long a client waits for a result and how often the
//! provider is asked about one task. They are evaluated in order and the
//! first match wins:
//!
//! 1. unknown id: synthesize a completed placeholder answer;
//! 2. task older than [`StatusPolicy::force_complete_after`]: force completion;
//! 3. checked less than [`StatusPolicy::check_debounce`] ago: answer from the store;
//! 4. otherwise: check the provider live.
//!
//! A failed live check is then resolved by [`decide_after_failed_check`].

use std::time::Duration;

use crate::task::Task;
use crate::types::{elapsed, Timestamp};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Age after which a task is reported as completed regardless of the provider.
pub const DEFAULT_FORCE_COMPLETE_AFTER: Duration = Duration::from_secs(10);
/// Minimum spacing between two live provider checks of one task.
pub const DEFAULT_CHECK_DEBOUNCE: Duration = Duration::from_secs(5);
/// Age after which a failed live check degrades into forced completion.
pub const DEFAULT_FAILURE_GRACE: Duration = Duration::from_secs(5);
/// Asset substituted when a task is completed without provider output.
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://placehold.co/1024x1024/png?text=Generating";

/// Tunable thresholds for the status policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    pub force_complete_after: Duration,
    pub check_debounce: Duration,
    pub failure_grace: Duration,
    pub placeholder_url: String,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            force_complete_after: DEFAULT_FORCE_COMPLETE_AFTER,
            check_debounce: DEFAULT_CHECK_DEBOUNCE,
            failure_grace: DEFAULT_FAILURE_GRACE,
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What to do for a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    /// The id was never registered. Answer completed with the placeholder.
    Synthesize,
    /// The task is too old to keep waiting on. Force completion.
    ForceComplete,
    /// The task was checked recently. Answer from the stored record.
    Debounced,
    /// Ask the provider.
    LiveCheck,
}

/// What to do after a live check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailureDecision {
    /// The task is past its grace period. Force completion.
    ForceComplete,
    /// Report `PROCESSING` with the failure message; keep the stored status.
    ReportProcessing,
}

/// Pick the rule that answers a status query for `task` at `now`.
///
/// - **Synthesize**: `task` is `None`
/// - **ForceComplete**: `now - created_at > force_complete_after`
/// - **Debounced**: `now - last_checked < check_debounce`
/// - **LiveCheck**: everything else
pub fn decide_status(task: Option<&Task>, now: Timestamp, policy: &StatusPolicy) -> StatusDecision {
    let Some(task) = task else {
        return StatusDecision::Synthesize;
    };

    if elapsed(task.created_at, now) > policy.force_complete_after {
        return StatusDecision::ForceComplete;
    }

    match task.last_checked {
        Some(checked) if elapsed(checked, now) < policy.check_debounce => StatusDecision::Debounced,
        _ => StatusDecision::LiveCheck,
    }
}

/// Resolve a failed live check for `task` at `now`.
pub fn decide_after_failed_check(
    task: &Task,
    now: Timestamp,
    policy: &StatusPolicy,
) -> CheckFailureDecision {
    if elapsed(task.created_at, now) > policy.failure_grace {
        CheckFailureDecision::ForceComplete
    } else {
        CheckFailureDecision::ReportProcessing
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::task::TaskStatus;

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn task_created_at(created_at: Timestamp) -> Task {
        Task::new("t1".into(), "a cat".into(), TaskStatus::Created, created_at)
    }

    #[test]
    fn unknown_task_is_synthesized() {
        let policy = StatusPolicy::default();
        assert_eq!(
            decide_status(None, Utc::now(), &policy),
            StatusDecision::Synthesize
        );
    }

    #[test]
    fn fresh_unchecked_task_is_checked_live() {
        let now = Utc::now();
        let task = task_created_at(now - secs(1));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::LiveCheck
        );
    }

    #[test]
    fn old_task_is_force_completed() {
        let now = Utc::now();
        let task = task_created_at(now - secs(11));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::ForceComplete
        );
    }

    #[test]
    fn force_threshold_is_strict() {
        let now = Utc::now();
        let task = task_created_at(now - secs(10));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::LiveCheck
        );
    }

    #[test]
    fn force_complete_wins_over_debounce() {
        let now = Utc::now();
        let mut task = task_created_at(now - secs(30));
        task.last_checked = Some(now - secs(1));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::ForceComplete
        );
    }

    #[test]
    fn recent_check_is_debounced() {
        let now = Utc::now();
        let mut task = task_created_at(now - secs(6));
        task.last_checked = Some(now - secs(4));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::Debounced
        );
    }

    #[test]
    fn debounce_window_expires() {
        let now = Utc::now();
        let mut task = task_created_at(now - secs(8));
        task.last_checked = Some(now - secs(5));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::LiveCheck
        );
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let policy = StatusPolicy {
            force_complete_after: Duration::from_secs(60),
            ..Default::default()
        };
        let now = Utc::now();
        let task = task_created_at(now - secs(30));
        assert_eq!(
            decide_status(Some(&task), now, &policy),
            StatusDecision::LiveCheck
        );
    }

    #[test]
    fn failure_within_grace_reports_processing() {
        let now = Utc::now();
        let task = task_created_at(now - secs(5));
        assert_eq!(
            decide_after_failed_check(&task, now, &StatusPolicy::default()),
            CheckFailureDecision::ReportProcessing
        );
    }

    #[test]
    fn failure_after_grace_forces_completion() {
        let now = Utc::now();
        let task = task_created_at(now - secs(6));
        assert_eq!(
            decide_after_failed_check(&task, now, &StatusPolicy::default()),
            CheckFailureDecision::ForceComplete
        );
    }

    #[test]
    fn clock_skew_counts_as_zero_age() {
        let now = Utc::now();
        let task = task_created_at(now + secs(3));
        assert_eq!(
            decide_status(Some(&task), now, &StatusPolicy::default()),
            StatusDecision::LiveCheck
        );
    }
}
