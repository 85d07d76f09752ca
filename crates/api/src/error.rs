use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use genproxy_core::error::CoreError;
use genproxy_provider::api::ProviderApiError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`ProviderApiError`] for
/// submission failures, which are relayed to the caller unchanged.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `genproxy_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The provider refused or failed a task creation.
    #[error(transparent)]
    Provider(#[from] ProviderApiError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- Provider errors (submission path) ---
            AppError::Provider(err) => return relay_provider_error(err),

            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::UnknownTask(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Task {id} not found"),
                ),
                CoreError::ProviderUnavailable { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_UNAVAILABLE",
                    core.to_string(),
                ),
                CoreError::ProviderRejected { status, .. } => (
                    status
                        .and_then(|s| StatusCode::from_u16(s).ok())
                        .unwrap_or(StatusCode::BAD_GATEWAY),
                    "PROVIDER_REJECTED",
                    core.to_string(),
                ),
                CoreError::TransientCheckFailure { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "CHECK_FAILED",
                    core.to_string(),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Relay a failed task creation to the caller.
///
/// - A provider answer keeps its status code, `Content-Type` and raw body.
/// - A provider answer with an empty body gets the error message instead.
/// - No answer at all (network failure, timeout, undecodable body) maps to
///   500 with the error message.
fn relay_provider_error(err: &ProviderApiError) -> Response {
    match err {
        ProviderApiError::ApiError {
            status,
            content_type,
            body,
        } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            tracing::warn!(status = status.as_u16(), "Provider rejected task creation");

            if body.iter().all(u8::is_ascii_whitespace) {
                let body = json!({
                    "error": err.to_string(),
                    "code": "PROVIDER_ERROR",
                });
                return (status, axum::Json(body)).into_response();
            }

            raw_response(status, content_type.as_deref(), body.clone())
        }
        other => {
            tracing::error!(error = %other, "Task creation failed without a provider answer");
            let body = json!({
                "error": other.to_string(),
                "code": "PROVIDER_UNAVAILABLE",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
    }
}

/// Build a response from provider bytes, setting `Content-Type` only when
/// the provider sent one.
pub(crate) fn raw_response(status: StatusCode, content_type: Option<&str>, body: Vec<u8>) -> Response {
    let mut response = (status, Body::from(body)).into_response();
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
