use std::sync::Arc;

use genproxy_provider::manager::TaskManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Task registry, pollers and provider client.
    pub task_manager: Arc<TaskManager>,
}
