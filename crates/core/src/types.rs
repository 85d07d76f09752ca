/// Provider-assigned task identifier.
pub type TaskId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Time elapsed between `since` and `now`, clamped at zero when the clock
/// went backwards.
pub fn elapsed(since: Timestamp, now: Timestamp) -> std::time::Duration {
    (now - since).to_std().unwrap_or_default()
}
