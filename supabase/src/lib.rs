//! HTTP transport for the hosted Finaptico backend (Supabase).
//!
//! # Architecture
//!
//! One [`Supabase`] handle owns a hardened `reqwest` client and fans out into
//! the three surfaces the dashboard consumes:
//!
//! - [`auth`] - GoTrue password/refresh grants and sign-out
//! - [`rest`] - direct PostgREST reads against SQL views with schema routing
//! - [`functions`] - Edge Function invocation, including the `dashboard`
//!   widget endpoint and the treasury feeds
//!
//! All computation happens server-side; every method here returns rows for
//! the caller to normalize and display.
//!
//! # Error Handling
//!
//! Transient failures (connection errors, 408/429/5xx) are retried with
//! exponential backoff by [`retry`]; whatever survives surfaces as a single
//! [`ApiError`]. Error bodies are read with a size cap so a broken proxy
//! cannot balloon memory.

pub mod auth;
pub mod functions;
pub mod rest;
pub mod retry;

pub use auth::Session;

use std::time::Duration;

use reqwest::Url;

pub use finaptico_types;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid project URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("project URL must use https: {0}")]
    InsecureUrl(String),
    #[error("anon key must not be empty")]
    EmptyAnonKey,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Validated project coordinates: base URL + anon (publishable) key.
///
/// The constructor is the only way in, so holding a value proves the URL
/// parsed and the key is non-empty. Plain http is accepted for loopback
/// hosts only, which is what the test servers bind to.
#[derive(Clone)]
pub struct SupabaseConfig {
    base_url: Url,
    anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(ConfigError::EmptyAnonKey);
        }

        let mut base_url = url.parse::<Url>().map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let loopback = matches!(
            base_url.host_str(),
            Some("localhost" | "127.0.0.1" | "::1" | "[::1]")
        );
        if base_url.scheme() != "https" && !(base_url.scheme() == "http" && loopback) {
            return Err(ConfigError::InsecureUrl(url.to_string()));
        }

        // Url::join treats a missing trailing slash as a file segment
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self { base_url, anon_key })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }
}

// Manual Debug impl to prevent leaking the anon key in logs.
impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Client handle for the hosted backend.
#[derive(Debug, Clone)]
pub struct Supabase {
    config: SupabaseConfig,
    http: reqwest::Client,
    retry: retry::RetryConfig,
}

impl Supabase {
    pub fn new(config: SupabaseConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()?;

        Ok(Self {
            config,
            http,
            retry: retry::RetryConfig::default(),
        })
    }

    /// Override the retry policy (tests use a zero-delay config).
    #[must_use]
    pub fn with_retry_config(mut self, retry: retry::RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Resolve a path like `functions/v1/dashboard` against the project URL.
    pub(crate) fn endpoint(&self, path: &str) -> Url {
        self.config
            .base_url
            .join(path)
            .expect("relative endpoint paths always join onto a validated base URL")
    }
}

/// Unified error for all backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("request failed after {attempts} attempts: {source}")]
    Connection { attempts: u32, source: reqwest::Error },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// An `{error: "..."}` envelope from an Edge Function.
    #[error("{0}")]
    Backend(String),
}

/// Convert a retry outcome into a response, folding failures into [`ApiError`].
pub(crate) async fn into_checked_response(
    outcome: retry::RetryOutcome,
) -> Result<reqwest::Response, ApiError> {
    match outcome {
        retry::RetryOutcome::Success(response) => Ok(response),
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status();
            let body = read_capped_error_body(response).await;
            Err(ApiError::Http { status, body })
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            Err(ApiError::Connection { attempts, source })
        }
        retry::RetryOutcome::NonRetryable(source) => Err(ApiError::Transport(source)),
    }
}

pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
