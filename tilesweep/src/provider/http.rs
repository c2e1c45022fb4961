//! HTTP client abstraction for testability

use super::types::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default total timeout for one tile request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent string for HTTP requests.
/// Required by some tile servers (e.g., Google) that reject requests without a User-Agent.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Trait for asynchronous HTTP GET.
///
/// The fetcher only ever needs "GET this URL, give me the body of a 2xx
/// response"; anything else is an error. Tests substitute canned clients.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// Returns the response body for a success status, or
    /// [`ProviderError::Status`] for any other status.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Async HTTP client implementation using reqwest.
///
/// Both the connect phase and the whole request are bounded so a stalled
/// server cannot hold a worker forever.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new client with default timeouts.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeouts(DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a new client with custom request and connect timeouts.
    pub fn with_timeouts(request: Duration, connect: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(request)
            .connect_timeout(connect)
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::Client(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(classify(e));
            }
        };

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(classify(e))
            }
        }
    }
}

fn classify(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_builder() {
        ProviderError::Client(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock async HTTP client keyed by URL.
    ///
    /// Unknown URLs answer with `fallback`. Every requested URL is recorded.
    pub struct MockAsyncHttpClient {
        pub responses: HashMap<String, Result<Vec<u8>, ProviderError>>,
        pub fallback: Result<Vec<u8>, ProviderError>,
        pub requested: Mutex<Vec<String>>,
    }

    impl MockAsyncHttpClient {
        pub fn always(response: Result<Vec<u8>, ProviderError>) -> Self {
            Self {
                responses: HashMap::new(),
                fallback: response,
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(
            mut self,
            url: &str,
            response: Result<Vec<u8>, ProviderError>,
        ) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        pub fn request_count(&self) -> usize {
            self.requested.lock().unwrap().len()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    #[tokio::test]
    async fn test_mock_async_client_routes_by_url() {
        let mock = MockAsyncHttpClient::always(Ok(vec![1, 2, 3]))
            .with_response("http://x/missing", Err(ProviderError::Status {
                status: 404,
                url: "http://x/missing".to_string(),
            }));

        assert_eq!(mock.get("http://x/ok").await.unwrap(), vec![1, 2, 3]);
        assert!(mock.get("http://x/missing").await.is_err());
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_reqwest_client_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tile"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8, 8, 7]))
            .mount(&server)
            .await;

        let client = AsyncReqwestClient::new().unwrap();
        let body = client.get(&format!("{}/tile", server.uri())).await.unwrap();
        assert_eq!(body, vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_reqwest_client_non_success_status() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AsyncReqwestClient::new().unwrap();
        let url = format!("{}/tile", server.uri());
        let err = client.get(&url).await.unwrap_err();
        assert_eq!(err, ProviderError::Status { status: 503, url });
    }

    #[tokio::test]
    async fn test_reqwest_client_timeout() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client =
            AsyncReqwestClient::with_timeouts(Duration::from_millis(100), Duration::from_secs(1))
                .unwrap();
        let err = client.get(&server.uri()).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }
}
