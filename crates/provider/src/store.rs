//! In-memory registry of tracked tasks.
//!
//! Each entry holds the [`Task`] record, the lock that serializes live
//! checks of that task, and the handle of its background poller.

use std::collections::HashMap;
use std::sync::Arc;

use genproxy_core::task::Task;
use genproxy_core::types::Timestamp;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running background poller.
pub struct PollerHandle {
    pub cancel: CancellationToken,
    pub task_handle: JoinHandle<()>,
}

struct TaskEntry {
    task: Task,
    check_lock: Arc<Mutex<()>>,
    poller: Option<PollerHandle>,
}

/// Registry of tasks keyed by provider task id.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between request handlers and pollers.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, TaskEntry>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a task record.
    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).map(|e| e.task.clone())
    }

    pub async fn contains(&self, task_id: &str) -> bool {
        self.tasks.read().await.contains_key(task_id)
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Insert a new task without a poller.
    ///
    /// Returns `false` and leaves the existing record alone if the id is
    /// already registered.
    pub async fn insert(&self, task: Task) -> bool {
        self.insert_with_poller(task, || None).await
    }

    /// Insert a new task and attach the poller built by `spawn`.
    ///
    /// `spawn` runs while the write lock is held, so the poller cannot
    /// observe the store before its own entry and handle are in place.
    /// Returns `false` without calling `spawn` if the id is already
    /// registered.
    pub async fn insert_with_poller<F>(&self, task: Task, spawn: F) -> bool
    where
        F: FnOnce() -> Option<PollerHandle>,
    {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return false;
        }

        let poller = spawn();
        tasks.insert(
            task.id.clone(),
            TaskEntry {
                task,
                check_lock: Arc::new(Mutex::new(())),
                poller,
            },
        );
        true
    }

    /// Apply `f` to a stored record under the write lock.
    ///
    /// Returns `None` if the id is not registered.
    pub async fn update<F, R>(&self, task_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut tasks = self.tasks.write().await;
        tasks.get_mut(task_id).map(|entry| f(&mut entry.task))
    }

    /// The lock serializing live checks of `task_id`.
    pub async fn check_lock(&self, task_id: &str) -> Option<Arc<Mutex<()>>> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .map(|e| Arc::clone(&e.check_lock))
    }

    /// Detach and return the poller handle of `task_id`, if one is attached.
    pub async fn take_poller(&self, task_id: &str) -> Option<PollerHandle> {
        self.tasks
            .write()
            .await
            .get_mut(task_id)
            .and_then(|e| e.poller.take())
    }

    /// Whether `task_id` still has a poller attached.
    pub async fn has_poller(&self, task_id: &str) -> bool {
        self.tasks
            .read()
            .await
            .get(task_id)
            .is_some_and(|e| e.poller.is_some())
    }

    /// Remove terminal tasks created before `cutoff`, returning their
    /// poller handles (if any) so the caller can stop them.
    pub async fn remove_terminal_before(
        &self,
        cutoff: Timestamp,
    ) -> Vec<(String, Option<PollerHandle>)> {
        let mut tasks = self.tasks.write().await;
        let expired: Vec<String> = tasks
            .iter()
            .filter(|(_, e)| e.task.status.is_terminal() && e.task.created_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| tasks.remove(&id).map(|e| (id, e.poller)))
            .collect()
    }

    /// Detach every poller handle. Used during shutdown.
    pub async fn drain_pollers(&self) -> Vec<(String, PollerHandle)> {
        self.tasks
            .write()
            .await
            .iter_mut()
            .filter_map(|(id, e)| e.poller.take().map(|p| (id.clone(), p)))
            .collect()
    }
}
