//! REST client for the image-generation provider.
//!
//! Wraps the two provider endpoints (task creation and status check)
//! using [`reqwest`]. The static credential is attached to every request
//! as a default header.

use std::time::Duration;

use async_trait::async_trait;
use genproxy_core::error::CoreError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::messages::TaskStatusResponse;

/// Default header carrying the provider credential.
pub const DEFAULT_AUTH_HEADER: &str = "x-api-key";

/// Default timeout for a single provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base HTTP URL, e.g. `https://api.provider.test/v1`.
    pub api_url: String,
    pub api_key: String,
    /// Header name the credential is sent in.
    pub auth_header: String,
    pub request_timeout: Duration,
}

/// An unmodified provider response, kept for relaying to the caller.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {}", String::from_utf8_lossy(.body))]
    ApiError {
        status: u16,
        /// The provider's `Content-Type`, if it sent one.
        content_type: Option<String>,
        /// Raw response body, relayed verbatim on the submission path.
        body: Vec<u8>,
    },

    /// A 2xx response whose body does not match the provider contract.
    #[error("Malformed provider response: {0}")]
    Decode(String),

    /// The client could not be built from its configuration.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderApiError {
    /// Shorthand for an [`ProviderApiError::ApiError`] with a text body and
    /// no content type.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        ProviderApiError::ApiError {
            status,
            content_type: None,
            body: body.into().into_bytes(),
        }
    }

    /// HTTP status code returned by the provider, if the request got that far.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderApiError::ApiError { status, .. } => Some(*status),
            ProviderApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ProviderApiError> for CoreError {
    fn from(err: ProviderApiError) -> Self {
        match err {
            ProviderApiError::Decode(msg) => CoreError::ProviderRejected {
                message: msg,
                status: None,
            },
            ProviderApiError::InvalidConfig(msg) => CoreError::Internal(msg),
            other => {
                let status = other.status_code();
                CoreError::from_provider_status(other.to_string(), status)
            }
        }
    }
}

/// Outbound operations against the generation provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submit a generation payload. Returns the raw provider response on a
    /// 2xx status and [`ProviderApiError::ApiError`] otherwise.
    async fn create_task(&self, payload: &serde_json::Value) -> Result<RawResponse, ProviderApiError>;

    /// Fetch the current provider-side status of a task.
    async fn check_status(&self, task_id: &str) -> Result<TaskStatusResponse, ProviderApiError>;
}

/// HTTP client for the generation provider.
pub struct ProviderApi {
    client: reqwest::Client,
    api_url: String,
}

impl std::fmt::Debug for ProviderApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderApi")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ProviderApi {
    /// Build a client with the credential header and request timeout applied.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderApiError> {
        let header_name = HeaderName::from_bytes(config.auth_header.as_bytes())
            .map_err(|e| ProviderApiError::InvalidConfig(format!("auth header name: {e}")))?;
        let mut header_value = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ProviderApiError::InvalidConfig(format!("api key: {e}")))?;
        header_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header_name, header_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(client, config.api_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`]. The
    /// client is expected to carry the credential header already.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderApiError::ApiError`]
    /// carrying the status, content type and raw body on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderApiError> {
        let status = response.status();
        if !status.is_success() {
            let content_type = content_type(&response);
            let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            return Err(ProviderApiError::ApiError {
                status: status.as_u16(),
                content_type,
                body,
            });
        }
        Ok(response)
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl GenerationProvider for ProviderApi {
    /// Sends `POST /tasks` with the payload exactly as received.
    async fn create_task(&self, payload: &serde_json::Value) -> Result<RawResponse, ProviderApiError> {
        let response = self
            .client
            .post(format!("{}/tasks", self.api_url))
            .json(payload)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let status = response.status().as_u16();
        let content_type = content_type(&response);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Sends `GET /tasks/{task_id}`.
    async fn check_status(&self, task_id: &str) -> Result<TaskStatusResponse, ProviderApiError> {
        let response = self
            .client
            .get(format!("{}/tasks/{}", self.api_url, task_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderApiError::Decode(e.to_string()))
    }
}
