use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{CxmlError, Result};

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Used when the sender header carries no user agent
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("cxml-outbound/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Status and body of a 2xx reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Delivers a rendered document to a remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url`. Non-2xx replies are errors.
    async fn post(&self, url: &str, body: String, user_agent: &str) -> Result<TransportResponse>;
}

/// reqwest-backed transport; one attempt per call, no retry
pub struct HttpTransport {
    client: Client,
    config: HttpClientConfig,
}

impl HttpTransport {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CxmlError::from)?;

        Ok(Self { client, config })
    }

    /// Make a single HTTP request with timeout
    async fn make_request(&self, url: &str, body: String, user_agent: &str) -> Result<Response> {
        let request_future = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/xml")
            .header(USER_AGENT, user_agent)
            .body(body)
            .send();

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request_future,
        )
        .await
        .map_err(|_| self.timeout_error(url))?
        .map_err(|e| self.classify(url, e))
    }

    fn timeout_error(&self, url: &str) -> CxmlError {
        CxmlError::Timeout {
            url: url.to_string(),
            timeout_seconds: self.config.timeout_seconds,
        }
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> CxmlError {
        if error.is_timeout() {
            self.timeout_error(url)
        } else {
            CxmlError::from(error)
        }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: String, user_agent: &str) -> Result<TransportResponse> {
        let user_agent = if user_agent.is_empty() {
            self.config.user_agent.as_str()
        } else {
            user_agent
        };

        let response = self.make_request(url, body, user_agent).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(CxmlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(url, e))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
