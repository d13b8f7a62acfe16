//! HTTP retry policy with exponential backoff.
//!
//! # Retry Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 400ms, doubled per attempt, capped at 8 seconds
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - `Retry-After` from the rate limiter wins over the computed backoff
//!
//! # Retryable Conditions
//!
//! - HTTP 408, 429, 5xx
//! - Connection and timeout errors
//!
//! 4xx responses other than 408/429 are surfaced immediately: PostgREST and
//! GoTrue use them for permission and validation failures that retrying
//! cannot fix.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial request).
    pub max_retries: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Zero-delay, no-jitter config for deterministic tests.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter_factor: 0.0,
        }
    }
}

/// Parse a `Retry-After` header (integer seconds).
///
/// Returns `Some` only for values in `(0, 60)` seconds; anything else falls
/// back to the computed backoff.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get("retry-after")?.to_str().ok()?.parse::<u64>().ok()?;
    let duration = Duration::from_secs(secs);
    (duration > Duration::ZERO && duration < Duration::from_secs(60)).then_some(duration)
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

/// Backoff for the retry after attempt `backoff_step` (0-based).
#[must_use]
pub fn retry_delay(backoff_step: u32, config: &RetryConfig, headers: Option<&HeaderMap>) -> Duration {
    if let Some(headers) = headers
        && let Some(delay) = parse_retry_after(headers)
    {
        return delay;
    }

    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Down-jitter: multiply by a random factor in [1 - jitter_factor, 1.0]
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// Outcome of a retried request.
///
/// A sum type that structurally separates success from failure, so a caller
/// cannot accidentally treat an error response as rows.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response after exhausting retries (or a non-retryable status).
    /// The response is kept for error-body inspection.
    HttpError(Response),
    /// Transport failure after exhausting retries.
    ConnectionError { attempts: u32, source: reqwest::Error },
    /// Transport failure on the first attempt that cannot be retried.
    NonRetryable(reqwest::Error),
}

impl RetryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Send a request with automatic retries.
///
/// `build_request` is called once per attempt; a `RequestBuilder` is consumed
/// by `send`, so the caller provides the recipe rather than the request.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let last = attempt >= config.max_retries;

        match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return RetryOutcome::Success(response);
                }
                if last || !should_retry(status) {
                    return RetryOutcome::HttpError(response);
                }

                let delay = retry_delay(attempt, config, Some(response.headers()));
                tracing::debug!(
                    status = %status,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying backend request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) => {
                if !is_retryable_error(&source) {
                    return if attempt == 0 {
                        RetryOutcome::NonRetryable(source)
                    } else {
                        RetryOutcome::ConnectionError {
                            attempts: attempt + 1,
                            source,
                        }
                    };
                }
                if last {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source,
                    };
                }

                let delay = retry_delay(attempt, config, None);
                tracing::debug!(
                    error = %source,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying backend request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_retry_after_rejects_out_of_range() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), None);

        headers.clear();
        headers.insert("retry-after", HeaderValue::from_static("0"));
        assert_eq!(parse_retry_after(&headers), None);

        headers.clear();
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn retryable_status_codes() {
        assert!(should_retry(StatusCode::REQUEST_TIMEOUT)); // 408
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS)); // 429
        assert!(should_retry(StatusCode::INTERNAL_SERVER_ERROR)); // 500
        assert!(should_retry(StatusCode::BAD_GATEWAY)); // 502
        assert!(should_retry(StatusCode::SERVICE_UNAVAILABLE)); // 503

        assert!(!should_retry(StatusCode::BAD_REQUEST)); // 400
        assert!(!should_retry(StatusCode::UNAUTHORIZED)); // 401
        assert!(!should_retry(StatusCode::NOT_FOUND)); // 404
        assert!(!should_retry(StatusCode::CONFLICT)); // 409: PostgREST constraint violation
    }

    #[test]
    fn retry_delay_bounds() {
        let config = RetryConfig::default();

        // First retry (step 0): base 400ms, jitter in [0.75, 1.0]
        for _ in 0..100 {
            let delay = retry_delay(0, &config, None);
            assert!(delay >= Duration::from_millis(300));
            assert!(delay <= Duration::from_millis(400));
        }

        // Second retry (step 1): base 800ms
        for _ in 0..100 {
            let delay = retry_delay(1, &config, None);
            assert!(delay >= Duration::from_millis(600));
            assert!(delay <= Duration::from_millis(800));
        }
    }

    #[test]
    fn retry_delay_respects_retry_after() {
        let config = RetryConfig::default();
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        assert_eq!(retry_delay(0, &config, Some(&headers)), Duration::from_secs(3));
    }
}

#[cfg(test)]
mod integration_tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use reqwest::StatusCode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{RetryConfig, RetryOutcome, send_with_retry};

    #[tokio::test]
    async fn success_on_first_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/rows", server.uri());
        let outcome = send_with_retry(|| client.get(&url), &RetryConfig::fast()).await;

        match outcome {
            RetryOutcome::Success(response) => assert_eq!(response.status(), StatusCode::OK),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        let attempt = AtomicU32::new(0);

        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(move |_: &wiremock::Request| {
                if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(429)
                } else {
                    ResponseTemplate::new(200).set_body_string("[]")
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/rows", server.uri());
        let outcome = send_with_retry(|| client.get(&url), &RetryConfig::fast()).await;
        assert!(outcome.is_success(), "expected Success, got {outcome:?}");
    }

    #[tokio::test]
    async fn exhausted_retries_return_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3) // initial + 2 retries
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/rows", server.uri());
        let outcome = send_with_retry(|| client.get(&url), &RetryConfig::fast()).await;

        match outcome {
            RetryOutcome::HttpError(response) => {
                assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn permission_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad jwt"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/rows", server.uri());
        let outcome = send_with_retry(|| client.get(&url), &RetryConfig::fast()).await;

        match outcome {
            RetryOutcome::HttpError(response) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }
}
