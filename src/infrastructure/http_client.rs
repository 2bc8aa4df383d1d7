//! HTTP client for catalog scraping with rate limiting and retry
//!
//! Two layers:
//! - `HttpTransport`: a single GET returning status and body (`ReqwestTransport`)
//! - `RateLimitedFetcher`: drives a `RetryPolicy` over any transport and
//!   exposes the `PageFetcher` interface the walker and service consume

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::fetch_error::{FetchError, FetchResult};
use crate::infrastructure::retry_policy::RetryPolicy;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One outbound GET, no retries
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> FetchResult<RawResponse>;
}

/// Page source consumed by the walker and the refresh service
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of a successful response; failures are already retried
    async fn fetch_page(&self, url: &str) -> FetchResult<String>;
}

/// `reqwest` transport with injected browser headers and an optional request quota
pub struct ReqwestTransport {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ReqwestTransport {
    pub fn new(config: &ScraperConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(&config.referer)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self { client, rate_limiter })
    }
}

fn header_value(value: &str) -> FetchResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| FetchError::Config {
        message: format!("Invalid header value '{value}': {e}"),
    })
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> FetchResult<RawResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!("HTTP GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            timed_out: e.is_timeout(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            timed_out: e.is_timeout(),
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(RawResponse { status, body })
    }
}

/// Retries transport failures according to a `RetryPolicy`
pub struct RateLimitedFetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl RateLimitedFetcher<ReqwestTransport> {
    pub fn from_config(scraper: &ScraperConfig, policy: RetryPolicy) -> FetchResult<Self> {
        Ok(Self::new(ReqwestTransport::new(scraper)?, policy))
    }
}

impl<T: HttpTransport> RateLimitedFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn attempt(&self, url: &str) -> FetchResult<String> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(FetchError::from_status(response.status, url));
        }
        if response.body.trim().is_empty() {
            return Err(FetchError::EmptyBody { url: url.to_string() });
        }
        Ok(response.body)
    }
}

#[async_trait]
impl<T: HttpTransport> PageFetcher for RateLimitedFetcher<T> {
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match self.attempt(url).await {
                Ok(body) => {
                    debug!("Fetched {} on attempt {} ({} bytes)", url, attempts, body.len());
                    return Ok(body);
                }
                Err(error) => error,
            };

            if !self.policy.is_retryable(&error) {
                warn!("Not retrying {}: {}", url, error);
                return Err(error);
            }
            if !self.policy.should_retry(&error, attempts) {
                warn!("Giving up on {} after {} attempts: {}", url, attempts, error);
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(&error);
            warn!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempts,
                self.policy.max_attempts(),
                url,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued responses and records every requested URL
    struct ScriptedTransport {
        responses: Mutex<VecDeque<FetchResult<RawResponse>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<FetchResult<RawResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> FetchResult<RawResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse { status: 500, body: String::new() }))
        }
    }

    fn ok(body: &str) -> FetchResult<RawResponse> {
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> FetchResult<RawResponse> {
        Ok(RawResponse {
            status: code,
            body: "error".to_string(),
        })
    }

    const URL: &str = "https://letterboxd.com/alice/films/by/date/";

    #[tokio::test]
    async fn first_success_needs_one_call() {
        let fetcher = RateLimitedFetcher::new(ScriptedTransport::new(vec![ok("<html></html>")]), RetryPolicy::immediate(3));
        assert_eq!(fetcher.fetch_page(URL).await.unwrap(), "<html></html>");
        assert_eq!(fetcher.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn throttling_is_retried_until_success() {
        let transport = ScriptedTransport::new(vec![status(429), status(429), ok("page")]);
        let fetcher = RateLimitedFetcher::new(transport, RetryPolicy::immediate(3));
        assert_eq!(fetcher.fetch_page(URL).await.unwrap(), "page");
        assert_eq!(fetcher.transport().call_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_with_last_error() {
        let transport = ScriptedTransport::new(vec![status(429), status(429), status(429), status(429), ok("late")]);
        let fetcher = RateLimitedFetcher::new(transport, RetryPolicy::immediate(3));

        let err = fetcher.fetch_page(URL).await.unwrap_err();
        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(err.status(), Some(429));
        assert_eq!(fetcher.transport().call_count(), 4);
    }

    #[tokio::test]
    async fn server_errors_and_transport_errors_use_same_budget() {
        let transport = ScriptedTransport::new(vec![
            status(503),
            Err(FetchError::Transport {
                url: URL.to_string(),
                message: "connection reset".to_string(),
                timed_out: false,
            }),
            ok("recovered"),
        ]);
        let fetcher = RateLimitedFetcher::new(transport, RetryPolicy::immediate(2));
        assert_eq!(fetcher.fetch_page(URL).await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let fetcher = RateLimitedFetcher::new(ScriptedTransport::new(vec![status(404)]), RetryPolicy::immediate(3));
        let err = fetcher.fetch_page(URL).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(fetcher.transport().call_count(), 1);
    }

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new(&ScraperConfig::default()).is_ok());
    }

    #[test]
    fn invalid_header_is_config_error() {
        let config = ScraperConfig {
            user_agent: "bad\nagent".to_string(),
            ..ScraperConfig::default()
        };
        assert!(matches!(ReqwestTransport::new(&config), Err(FetchError::Config { .. })));
    }
}
