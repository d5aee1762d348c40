//! Page source protocol.

use async_trait::async_trait;

use crate::error::FetchError;

/// Provides the raw markup of a page after its configured load-wait.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
