//! Shared HTTP client with retries for transient failures.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::error::GreenCardError;

/// A simple wrapper on an HTTP client for making requests. Sets sensible defaults such as timeouts,
/// user-agent & ensuring HTTPS, and retries requests that never reached the server.
///
/// HTTP status codes are not retried here. A provider or server failure is not transient
/// for the current input, so callers classify them.
pub struct Request {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub(crate) fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::new();
        let max_retries = 2; // total attempts = 3
        Self {
            client,
            timeout,
            max_retries,
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        #[cfg(not(test))]
        assert!(url.starts_with("https"));

        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("greencard-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    /// Creates a GET request builder with defaults applied.
    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.req(Method::GET, url)
    }

    /// Creates a POST request builder with defaults applied.
    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Sends a request built by `req`/`get`/`post`, retrying connect and timeout failures.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, GreenCardError> {
        let Some(template) = request_builder.try_clone() else {
            return execute_request_builder(request_builder)
                .await
                .map_err(Into::into);
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async {
            let request_builder = template.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    "request cannot be retried because it is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request_builder).await
        })
        .retry(backoff)
        .when(RequestHandleError::is_retryable)
        .notify(|err, delay| {
            log::debug!("retrying {} in {delay:?}: {}", err.url, err.error);
        })
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    const fn retryable(url: String, error: String) -> Self {
        Self {
            url,
            error,
            retryable: true,
        }
    }

    const fn permanent(url: String, error: String) -> Self {
        Self {
            url,
            error,
            retryable: false,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for GreenCardError {
    fn from(value: RequestHandleError) -> Self {
        Self::NetworkError {
            url: value.url,
            error: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => Ok(resp),
        Err(err) => {
            if err.is_timeout() || err.is_connect() {
                return Err(RequestHandleError::retryable(
                    url,
                    format!("request timeout/connect error: {err}"),
                ));
            }

            Err(RequestHandleError::permanent(
                url,
                format!("request failed: {err}"),
            ))
        }
    }
}
