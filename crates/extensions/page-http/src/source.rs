//! HTTP page source implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use pagecase_protocols::error::FetchError;
use pagecase_protocols::page::PageSource;

/// Fetches page markup with a GET request, then waits out the configured
/// load-wait before handing it over.
pub struct HttpPageSource {
    client: Client,
    timeout: Duration,
    load_wait: Duration,
}

impl HttpPageSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            load_wait: Duration::ZERO,
        })
    }

    pub fn with_load_wait(mut self, load_wait: Duration) -> Self {
        self.load_wait = load_wait;
        self
    }

    fn request_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
        }

        info!(url = %parsed, "Fetching page");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let markup = response.text().await.map_err(|e| self.request_error(e))?;
        debug!(bytes = markup.len(), "Page markup received");

        if !self.load_wait.is_zero() {
            tokio::time::sleep(self.load_wait).await;
        }
        Ok(markup)
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
