#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use genproxy_core::status_policy::StatusPolicy;
use genproxy_core::task::Task;
use genproxy_provider::api::{GenerationProvider, ProviderConfig};
use genproxy_provider::manager::TaskManager;
use genproxy_provider::poller::PollerConfig;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use genproxy_provider::mock::{ScriptedCheck, ScriptedProvider};

use genproxy_api::config::ServerConfig;
use genproxy_api::routes;
use genproxy_api::state::AppState;

pub const PLACEHOLDER: &str = "https://example.test/placeholder.png";

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        provider: ProviderConfig {
            api_url: "http://provider.invalid".to_string(),
            api_key: "test-key".to_string(),
            auth_header: "x-api-key".to_string(),
            request_timeout: Duration::from_secs(5),
        },
        status_policy: test_policy(),
        poller: idle_pollers(),
        task_retention: None,
        retention_sweep_interval: Duration::from_secs(60),
    }
}

/// Default thresholds with a recognisable placeholder.
pub fn test_policy() -> StatusPolicy {
    StatusPolicy {
        placeholder_url: PLACEHOLDER.to_string(),
        ..Default::default()
    }
}

/// Pollers that check once on registration and then stay idle.
pub fn idle_pollers() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_secs(3600),
        failure_backoff: Duration::from_secs(3600),
    }
}

/// A running test application.
pub struct TestApp {
    pub router: Router,
    pub manager: Arc<TaskManager>,
    pub provider: Arc<ScriptedProvider>,
}

/// Build the full application router with all middleware layers on top of
/// `provider`.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_test_app(provider: ScriptedProvider) -> TestApp {
    let config = test_config();
    let provider = Arc::new(provider);
    let manager = TaskManager::new(
        Arc::clone(&provider) as Arc<dyn GenerationProvider>,
        config.status_policy.clone(),
        config.poller,
    );

    let state = AppState {
        task_manager: Arc::clone(&manager),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .merge(routes::generation_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        manager,
        provider,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Registry helpers
// ---------------------------------------------------------------------------

/// Wait until the registration poller has recorded its first check.
pub async fn wait_for_first_check(manager: &TaskManager, task_id: &str) -> Task {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(task) = manager.store().get(task_id).await {
                if task.last_checked.is_some() {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("poller never checked the task")
}

/// Shift a task's timestamps into the past.
pub async fn age_task(
    manager: &TaskManager,
    task_id: &str,
    created_secs_ago: i64,
    checked_secs_ago: Option<i64>,
) {
    let now = Utc::now();
    manager
        .store()
        .update(task_id, |t| {
            t.created_at = now - chrono::Duration::seconds(created_secs_ago);
            t.last_checked = checked_secs_ago.map(|s| now - chrono::Duration::seconds(s));
            t.last_error = None;
        })
        .await
        .expect("task must be tracked");
}
