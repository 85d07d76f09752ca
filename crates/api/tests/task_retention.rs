//! Tests for the background eviction of finished tasks.

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{build_test_app, ScriptedProvider};
use genproxy_api::background::task_retention;
use genproxy_core::task::{Task, TaskStatus};
use tokio_util::sync::CancellationToken;

fn task(id: &str, status: TaskStatus, age_secs: i64) -> Task {
    Task::new(
        id.into(),
        "a cat".into(),
        status,
        Utc::now() - chrono::Duration::seconds(age_secs),
    )
}

#[tokio::test]
async fn sweep_evicts_only_old_terminal_tasks() {
    let app = build_test_app(ScriptedProvider::new(vec![]));
    let store = app.manager.store();
    store.insert(task("old-done", TaskStatus::Completed, 120)).await;
    store.insert(task("old-failed", TaskStatus::Failed, 120)).await;
    store.insert(task("old-pending", TaskStatus::Processing, 120)).await;
    store.insert(task("new-done", TaskStatus::Completed, 1)).await;

    let evicted = task_retention::sweep(&app.manager, Duration::from_secs(60)).await;

    assert_eq!(evicted, 2);
    assert!(!store.contains("old-done").await);
    assert!(!store.contains("old-failed").await);
    assert!(store.contains("old-pending").await);
    assert!(store.contains("new-done").await);
}

#[tokio::test]
async fn retention_job_runs_until_cancelled() {
    let app = build_test_app(ScriptedProvider::new(vec![]));
    app.manager
        .store()
        .insert(task("old-done", TaskStatus::Completed, 120))
        .await;
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(task_retention::run(
        app.manager.clone(),
        Duration::from_secs(60),
        Duration::from_millis(10),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.manager.store().is_empty().await);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("retention job should stop after cancellation")
        .unwrap();
}
