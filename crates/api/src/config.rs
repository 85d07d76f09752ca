use std::str::FromStr;
use std::time::Duration;

use genproxy_core::status_policy::{
    StatusPolicy, DEFAULT_CHECK_DEBOUNCE, DEFAULT_FAILURE_GRACE, DEFAULT_FORCE_COMPLETE_AFTER,
    DEFAULT_PLACEHOLDER_URL,
};
use genproxy_provider::api::{ProviderConfig, DEFAULT_AUTH_HEADER, DEFAULT_REQUEST_TIMEOUT};
use genproxy_provider::poller::{PollerConfig, DEFAULT_FAILURE_BACKOFF, DEFAULT_POLL_INTERVAL};

/// Server configuration loaded from environment variables.
///
/// All fields except the provider credential have defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background jobs, in seconds (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// Provider endpoint, credential and outbound timeout.
    pub provider: ProviderConfig,
    /// Thresholds and placeholder for status queries.
    pub status_policy: StatusPolicy,
    /// Background poller delays.
    pub poller: PollerConfig,
    /// Age after which terminal tasks are evicted. `None` keeps tasks for
    /// the lifetime of the process.
    pub task_retention: Option<Duration>,
    /// How often the retention job runs (default: `60` seconds).
    pub retention_sweep_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                                             |
    /// |-----------------------------|-----------------------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                                           |
    /// | `PORT`                      | `3000`                                              |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`                             |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                                                |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `5`                                                 |
    /// | `PROVIDER_API_URL`          | `http://localhost:8080`                             |
    /// | `PROVIDER_API_KEY`          | required                                            |
    /// | `PROVIDER_AUTH_HEADER`      | `x-api-key`                                         |
    /// | `PROVIDER_TIMEOUT_SECS`     | `30`                                                |
    /// | `TASK_FORCE_COMPLETE_SECS`  | `10`                                                |
    /// | `TASK_CHECK_DEBOUNCE_SECS`  | `5`                                                 |
    /// | `TASK_FAILURE_GRACE_SECS`   | `5`                                                 |
    /// | `TASK_POLL_INTERVAL_SECS`   | `10`                                                |
    /// | `TASK_POLL_BACKOFF_SECS`    | `20`                                                |
    /// | `PLACEHOLDER_IMAGE_URL`     | `https://placehold.co/1024x1024/png?text=Generating`|
    /// | `TASK_RETENTION_SECS`       | unset (retention disabled)                          |
    /// | `TASK_RETENTION_SWEEP_SECS` | `60`                                                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let provider = ProviderConfig {
            api_url: std::env::var("PROVIDER_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            api_key: std::env::var("PROVIDER_API_KEY").expect("PROVIDER_API_KEY must be set"),
            auth_header: std::env::var("PROVIDER_AUTH_HEADER")
                .unwrap_or_else(|_| DEFAULT_AUTH_HEADER.into()),
            request_timeout: env_secs("PROVIDER_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT),
        };

        let status_policy = StatusPolicy {
            force_complete_after: env_secs("TASK_FORCE_COMPLETE_SECS", DEFAULT_FORCE_COMPLETE_AFTER),
            check_debounce: env_secs("TASK_CHECK_DEBOUNCE_SECS", DEFAULT_CHECK_DEBOUNCE),
            failure_grace: env_secs("TASK_FAILURE_GRACE_SECS", DEFAULT_FAILURE_GRACE),
            placeholder_url: std::env::var("PLACEHOLDER_IMAGE_URL")
                .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_URL.into()),
        };

        let poller = PollerConfig {
            interval: env_secs("TASK_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL),
            failure_backoff: env_secs("TASK_POLL_BACKOFF_SECS", DEFAULT_FAILURE_BACKOFF),
        };

        let task_retention = std::env::var("TASK_RETENTION_SECS").ok().map(|v| {
            Duration::from_secs(
                v.parse()
                    .expect("TASK_RETENTION_SECS must be a valid u64"),
            )
        });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 5),
            provider,
            status_policy,
            poller,
            task_retention,
            retention_sweep_interval: env_secs("TASK_RETENTION_SWEEP_SECS", Duration::from_secs(60)),
        }
    }
}

/// Parse `name` from the environment, falling back to `default` when unset.
///
/// Panics on a value that does not parse: misconfiguration should fail
/// at startup.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} is invalid ({raw}): {e}")),
        Err(_) => default,
    }
}

/// Like [`env_or`] for a whole number of seconds.
fn env_secs(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(name, default.as_secs()))
}
