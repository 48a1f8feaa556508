//! Analytics Engine Client
//!
//! HTTP transport for query execution against the analytics engine. Owns
//! connection options (auth, TLS, timeouts) and bounded retries; result
//! interpretation lives entirely in the normalize layer.

use crate::engine::query::CompiledQuery;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// Analytics engine HTTP client
pub struct EngineClient {
    client: Client,
    config: EngineConfig,
}

/// Configuration for the engine client
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL for the engine (e.g. "http://localhost:8888")
    pub base_url: String,
    /// Query endpoint path
    pub query_path: String,
    /// Basic auth user; auth is sent only when set
    pub basic_auth_user: Option<String>,
    /// Basic auth password
    pub basic_auth_password: Option<String>,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum retry attempts per query
    pub max_retries: u32,
    /// Minimum backoff between retries in milliseconds
    pub retry_wait_min_ms: u64,
    /// Maximum backoff between retries in milliseconds
    pub retry_wait_max_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888".to_string(),
            query_path: "/query".to_string(),
            basic_auth_user: None,
            basic_auth_password: None,
            skip_tls_verify: false,
            request_timeout_ms: 30_000,
            max_retries: 3,
            retry_wait_min_ms: 500,
            retry_wait_max_ms: 5_000,
        }
    }
}

impl EngineClient {
    /// Create a new engine client with the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(EngineError::Request)?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a compiled query and return the engine's raw JSON result.
    ///
    /// Retries transport-level failures with bounded backoff; HTTP error
    /// statuses are surfaced as API errors without retry.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<Value, EngineError> {
        let url = format!("{}{}", self.config.base_url, self.config.query_path);
        let mut last_error = EngineError::Unavailable;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = (self.config.retry_wait_min_ms * 2u64.pow(attempt - 1))
                    .min(self.config.retry_wait_max_ms);
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }

            let mut request = self.client.post(&url).json(query.body());
            if let Some(user) = &self.config.basic_auth_user {
                request = request.basic_auth(user, self.config.basic_auth_password.as_deref());
            }

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.json().await.map_err(EngineError::Request);
                    }
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(EngineError::ApiError {
                        status: status.as_u16(),
                        message: text,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "engine request failed");
                    last_error = if e.is_timeout() {
                        EngineError::Timeout
                    } else if e.is_connect() {
                        EngineError::Unavailable
                    } else {
                        EngineError::Request(e)
                    };
                    continue;
                }
            }
        }

        Err(last_error)
    }
}

/// Errors that can occur when communicating with the analytics engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine unavailable")]
    Unavailable,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("engine error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("request timeout")]
    Timeout,
}
