//! HTTP transport shared by every endpoint call.
//!
//! Applies the client timeout, classifies failures, and retries server errors
//! with exponential backoff. Only responses with a 5xx status are retried;
//! timeouts, connection failures and 4xx responses are returned as they are.

use crate::core::config::{AppConfig, RetryConfig, RetryScope};
use crate::core::error::TransportError;
use anyhow::{Context, Result};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestRoot {
    Api,
    Service,
}

/// A single outbound call, described independently of the client that sends it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    route: String,
    segments: Vec<String>,
    path: String,
    query: Vec<(String, String)>,
    retryable: bool,
    root: RequestRoot,
}

impl ApiRequest {
    pub fn get(route: impl Into<String>) -> Self {
        let route = route.into();
        Self {
            method: Method::GET,
            path: route.clone(),
            route,
            segments: Vec::new(),
            query: Vec::new(),
            retryable: true,
            root: RequestRoot::Api,
        }
    }

    /// Appends one percent-encoded path segment, so ids cannot alter the route.
    pub fn segment(mut self, value: &str) -> Self {
        self.path = format!("{}/{}", self.path, value);
        self.segments.push(value.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Opts this request out of server-error retries.
    pub fn no_retry(mut self) -> Self {
        self.retryable = false;
        self
    }

    /// Resolves the path against the service root instead of the API base.
    pub fn at_service_root(mut self) -> Self {
        self.root = RequestRoot::Service;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    base_url: String,
    service_root: String,
    retry: RetryConfig,
    shared_retries: Arc<AtomicU32>,
}

impl TransportClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fundwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let service_root = base_url
            .strip_suffix("/api")
            .unwrap_or(&base_url)
            .to_string();

        Ok(Self {
            http,
            base_url,
            service_root,
            retry,
            shared_retries: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.api.base_url,
            config.api.timeout(),
            config.retry.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retries currently drawn from the shared allowance. Always zero in per-request scope.
    pub fn shared_retries_in_use(&self) -> u32 {
        self.shared_retries.load(Ordering::SeqCst)
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let root = match request.root {
            RequestRoot::Api => &self.base_url,
            RequestRoot::Service => &self.service_root,
        };
        let raw = format!("{}{}", root, request.route);
        let invalid = |reason: String| TransportError::Connection {
            path: request.path.clone(),
            message: format!("invalid URL {raw}: {reason}"),
        };
        let mut url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| invalid("cannot have path segments".to_string()))?
                .extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    /// Takes one retry from the allowance, returning its 1-based number.
    fn reserve_retry(&self, used_by_request: &mut u32) -> Option<u32> {
        let max = self.retry.max_retries;
        match self.retry.scope {
            RetryScope::PerRequest => {
                if *used_by_request >= max {
                    return None;
                }
                *used_by_request += 1;
                Some(*used_by_request)
            }
            RetryScope::Shared => self
                .shared_retries
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    (used < max).then_some(used + 1)
                })
                .ok()
                .map(|previous| previous + 1),
        }
    }

    #[instrument(
        name = "TransportSend",
        skip(self, request),
        fields(path = %request.path)
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, TransportError> {
        let url = self.url_for(request)?;
        let mut used_by_request = 0;
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Requesting {}", url);

            let response = self
                .http
                .request(request.method.clone(), url.clone())
                .send()
                .await
                .map_err(|e| classify(e, &request.path))?;

            let status = response.status();
            if status.is_success() {
                if self.retry.scope == RetryScope::Shared {
                    self.shared_retries.store(0, Ordering::SeqCst);
                }
                return Ok(response);
            }

            if status == StatusCode::NOT_FOUND {
                return Err(TransportError::NotFound {
                    path: request.path.clone(),
                });
            }

            if !status.is_server_error() {
                return Err(TransportError::Rejected {
                    path: request.path.clone(),
                    status: status.as_u16(),
                });
            }

            let server_error = TransportError::Server {
                path: request.path.clone(),
                status: status.as_u16(),
                attempts,
            };

            if !request.retryable {
                return Err(server_error);
            }

            let Some(retry) = self.reserve_retry(&mut used_by_request) else {
                warn!(%status, attempts, "Retries exhausted");
                return Err(server_error);
            };

            let delay = backoff_delay(self.retry.base_delay(), retry);
            warn!(
                %status,
                retry,
                delay_ms = delay.as_millis() as u64,
                "Server error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sends the request and decodes a JSON body into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, TransportError> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| classify(e, &request.path))?;

        serde_json::from_str(&text).map_err(|e| {
            debug!(error = %e, response = %text, "Failed to parse response");
            TransportError::Decode {
                path: request.path.clone(),
                message: e.to_string(),
            }
        })
    }
}

fn classify(err: reqwest::Error, path: &str) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            path: path.to_string(),
        }
    } else {
        TransportError::Connection {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retry_config(base_delay_ms: u64, scope: RetryScope) -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms,
            scope,
        }
    }

    fn client(server: &MockServer, retry: RetryConfig) -> TransportClient {
        let base_url = format!("{}/api", server.uri());
        TransportClient::new(&base_url, Duration::from_secs(5), retry).unwrap()
    }

    async fn mount_status(server: &MockServer, request_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
    }

    #[test]
    fn test_service_root_strips_api_prefix() {
        let transport = TransportClient::new(
            "http://localhost:8000/api/",
            Duration::from_secs(1),
            RetryConfig::default(),
        )
        .unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000/api");

        let health = transport
            .url_for(&ApiRequest::get("/health").at_service_root())
            .unwrap();
        assert_eq!(health.as_str(), "http://localhost:8000/health");

        let history = transport
            .url_for(&ApiRequest::get("/prices/history/az_gold").query("days", 7))
            .unwrap();
        assert_eq!(
            history.as_str(),
            "http://localhost:8000/api/prices/history/az_gold?days=7"
        );
    }

    #[tokio::test]
    async fn test_successful_json_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/history/az_gold"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"days": 7}"#))
            .mount(&server)
            .await;

        let transport = client(&server, RetryConfig::default());
        let request = ApiRequest::get("/prices/history/az_gold").query("days", 7);
        let body: serde_json::Value = transport.fetch_json(&request).await.unwrap();
        assert_eq!(body["days"], 7);
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/prices/current", 400).await;

        let transport = client(&server, retry_config(1, RetryScope::PerRequest));
        let result = transport.send(&ApiRequest::get("/prices/current")).await;

        assert_eq!(
            result.unwrap_err(),
            TransportError::Rejected {
                path: "/prices/current".to_string(),
                status: 400
            }
        );
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_surfaced_without_retry() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/prices/fund/unknown", 404).await;

        let transport = client(&server, retry_config(1, RetryScope::PerRequest));
        let result = transport.send(&ApiRequest::get("/prices/fund/unknown")).await;

        assert!(matches!(result, Err(TransportError::NotFound { .. })));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_server_errors_retry_three_times_then_fail() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/sentiment/all", 500).await;

        let transport = client(&server, retry_config(20, RetryScope::PerRequest));
        let started = Instant::now();
        let result = transport.send(&ApiRequest::get("/sentiment/all")).await;

        assert_eq!(
            result.unwrap_err(),
            TransportError::Server {
                path: "/sentiment/all".to_string(),
                status: 500,
                attempts: 4
            }
        );
        assert_eq!(request_count(&server).await, 4);
        // 20ms + 40ms + 80ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(140));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/current"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/prices/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .with_priority(2)
            .mount(&server)
            .await;

        let transport = client(&server, retry_config(1, RetryScope::PerRequest));
        let body: Vec<serde_json::Value> = transport
            .fetch_json(&ApiRequest::get("/prices/current"))
            .await
            .unwrap();

        assert!(body.is_empty());
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_request_fails_on_first_server_error() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/sentiment/alerts", 502).await;

        let transport = client(&server, retry_config(1, RetryScope::PerRequest));
        let result = transport
            .send(&ApiRequest::get("/sentiment/alerts").no_retry())
            .await;

        assert!(matches!(
            result,
            Err(TransportError::Server {
                status: 502,
                attempts: 1,
                ..
            })
        ));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/current"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let base_url = format!("{}/api", server.uri());
        let transport = TransportClient::new(
            &base_url,
            Duration::from_millis(50),
            retry_config(1, RetryScope::PerRequest),
        )
        .unwrap();
        let result = transport.send(&ApiRequest::get("/prices/current")).await;

        assert_eq!(
            result.unwrap_err(),
            TransportError::Timeout {
                path: "/prices/current".to_string()
            }
        );
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let transport = TransportClient::new(
            "http://127.0.0.1:1/api",
            Duration::from_secs(2),
            retry_config(1, RetryScope::PerRequest),
        )
        .unwrap();
        let result = transport.send(&ApiRequest::get("/prices/current")).await;
        assert!(result.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let transport = client(&server, RetryConfig::default());
        let result: Result<serde_json::Value, _> =
            transport.fetch_json(&ApiRequest::get("/prices/current")).await;
        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_per_request_scope_gives_each_request_its_own_retries() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/prices/current", 500).await;
        mount_status(&server, "/api/sentiment/all", 500).await;

        let transport = client(&server, retry_config(1, RetryScope::PerRequest));
        let (prices_req, sentiment_req) = (
            ApiRequest::get("/prices/current"),
            ApiRequest::get("/sentiment/all"),
        );
        let (prices, sentiment) = tokio::join!(
            transport.send(&prices_req),
            transport.send(&sentiment_req),
        );

        assert!(matches!(prices, Err(TransportError::Server { attempts: 4, .. })));
        assert!(matches!(sentiment, Err(TransportError::Server { attempts: 4, .. })));
        assert_eq!(request_count(&server).await, 8);
        assert_eq!(transport.shared_retries_in_use(), 0);
    }

    // Compatibility mode: one allowance for the whole client. A failure chain on
    // one endpoint starves unrelated requests until something succeeds.
    #[tokio::test]
    async fn test_shared_scope_exhausts_retries_across_requests() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/prices/current", 500).await;
        mount_status(&server, "/api/sentiment/all", 500).await;
        Mock::given(method("GET"))
            .and(path("/api/sentiment/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"alerts": []}"#))
            .mount(&server)
            .await;

        let transport = client(&server, retry_config(1, RetryScope::Shared));

        let first = transport.send(&ApiRequest::get("/prices/current")).await;
        assert!(matches!(first, Err(TransportError::Server { attempts: 4, .. })));
        assert_eq!(transport.shared_retries_in_use(), 3);

        let second = transport.send(&ApiRequest::get("/sentiment/all")).await;
        assert!(matches!(second, Err(TransportError::Server { attempts: 1, .. })));

        // Any success hands the allowance back
        transport
            .send(&ApiRequest::get("/sentiment/alerts"))
            .await
            .unwrap();
        assert_eq!(transport.shared_retries_in_use(), 0);

        let third = transport.send(&ApiRequest::get("/sentiment/all")).await;
        assert!(matches!(third, Err(TransportError::Server { attempts: 4, .. })));
    }

    #[tokio::test]
    async fn test_shared_scope_is_split_between_concurrent_requests() {
        let server = MockServer::start().await;
        mount_status(&server, "/api/prices/current", 500).await;
        mount_status(&server, "/api/sentiment/all", 500).await;

        let transport = client(&server, retry_config(1, RetryScope::Shared));
        let (prices_req, sentiment_req) = (
            ApiRequest::get("/prices/current"),
            ApiRequest::get("/sentiment/all"),
        );
        let (prices, sentiment) = tokio::join!(
            transport.send(&prices_req),
            transport.send(&sentiment_req),
        );

        let attempts = |result: &Result<Response, TransportError>| match result {
            Err(TransportError::Server { attempts, .. }) => *attempts,
            other => panic!("expected a server error, got {other:?}"),
        };
        // Two first attempts plus the three retries both requests compete for
        assert_eq!(attempts(&prices) + attempts(&sentiment), 5);
        assert_eq!(request_count(&server).await, 5);
        assert_eq!(transport.shared_retries_in_use(), 3);
    }

    #[tokio::test]
    async fn test_path_segments_are_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/history/a%2Fb%3Fdays=1"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = client(&server, RetryConfig::default());
        let request = ApiRequest::get("/prices/history")
            .segment("a/b?days=1")
            .query("days", 7);
        assert_eq!(request.path(), "/prices/history/a/b?days=1");

        transport.send(&request).await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("days=7"));
    }
}
