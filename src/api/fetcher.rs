use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::utils::json::preview;

pub const USER_AGENT: &str = "furfriends/1.0";

const PREVIEW_CHARS: usize = 300;

#[derive(Clone, Debug)]
pub struct FetchedText {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {preview}")]
    Status { status: u16, preview: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// One GET against an upstream source, with a per-call deadline.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// Returns the body for any HTTP status.
    async fn fetch_raw(&self, url: &str, timeout: Duration) -> Result<FetchedText, FetchError>;

    /// Like [`TextFetcher::fetch_raw`], but a non-2xx status is an error.
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<FetchedText, FetchError> {
        let fetched = self.fetch_raw(url, timeout).await?;

        if !(200..300).contains(&fetched.status) {
            return Err(FetchError::Status {
                status: fetched.status,
                preview: preview(&fetched.body, PREVIEW_CHARS),
            });
        }
        Ok(fetched)
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_raw(&self, url: &str, timeout: Duration) -> Result<FetchedText, FetchError> {
        debug!("Sending request to {}", url);
        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(FetchedText { status, body })
        };

        // Dropping the future on timeout cancels the in-flight request.
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(fetched)) => {
                debug!(
                    "Received {} bytes from {} (HTTP {})",
                    fetched.body.len(),
                    url,
                    fetched.status
                );
                Ok(fetched)
            }
            Ok(Err(e)) => Err(FetchError::Network(e.to_string())),
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }
}
