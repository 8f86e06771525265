use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::Result;

/// One fetched response, reduced to what the cache needs. `body` is already
/// decoded to UTF-8 text using the origin's declared charset.
#[derive(Clone, Debug)]
pub struct FetchedPage {
    pub status_message: String,
    pub content_type: String,
    pub body: String,
}

/// Outbound fetch capability. The production implementation is
/// [`ReqwestFetcher`]; tests substitute their own.
#[async_trait]
pub trait FetchPort: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<FetchedPage>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds the shared client once; every request through it carries the
    /// configured timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchPort for ReqwestFetcher {
    async fn fetch(&self, uri: &str) -> Result<FetchedPage> {
        let resp = self.client.get(uri).send().await?;
        let status = resp.status();
        let status_message = status
            .canonical_reason()
            .unwrap_or(status.as_str())
            .to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = resp.text().await?;
        Ok(FetchedPage {
            status_message,
            content_type,
            body,
        })
    }
}
