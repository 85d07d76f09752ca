pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Build the generation route tree.
///
/// ```text
/// POST   /generate        submit a generation payload (relayed to the provider)
/// GET    /task/{id}       task status under the status policy
/// ```
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::submit_generation))
        .route("/task/{id}", get(generation::get_task_status))
}
