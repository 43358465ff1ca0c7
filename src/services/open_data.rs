use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::fetcher::{FetchError, TextFetcher};
use crate::api::sources::{Source, SourceCatalog};
use crate::models::cache::TtlCache;
use crate::models::dataset::Dataset;
use crate::utils::json::{parse_array, preview};

const PREVIEW_CHARS: usize = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// `delay * attempt`
    Linear,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "linear" => Ok(Backoff::Linear),
            other => Err(format!("expected `fixed` or `linear`, got {other:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Attempts per source.
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    /// Deadline for a single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
            backoff: Backoff::Fixed,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Where a served payload came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched from upstream during this call.
    Live,
    /// Served from a cache entry younger than the TTL.
    Cached,
    /// Served from an expired entry because every source failed.
    Stale,
}

impl Freshness {
    pub fn as_str(self) -> &'static str {
        match self {
            Freshness::Live => "live",
            Freshness::Cached => "cached",
            Freshness::Stale => "stale",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatasetPayload {
    pub records: Vec<Value>,
    pub freshness: Freshness,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenDataError {
    #[error("all upstream sources failed for {key} after {attempts} attempts")]
    Exhausted {
        key: String,
        attempts: u32,
        last_error: String,
    },
}

impl OpenDataError {
    pub fn detail(&self) -> &str {
        match self {
            OpenDataError::Exhausted { last_error, .. } => last_error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("upstream is not a JSON array: {0}")]
    NotArray(String),
}

/// Result of a single uncached, unretried request against the direct source.
#[derive(Clone, Debug)]
pub struct Probe {
    pub url: String,
    pub status: Option<u16>,
    pub length: usize,
    pub preview: String,
    pub error: Option<String>,
}

/// Fetches open-data datasets through the ordered source list, caching the
/// last good array per dataset.
pub struct OpenDataService {
    fetcher: Arc<dyn TextFetcher>,
    cache: TtlCache,
    catalog: SourceCatalog,
    policy: RetryPolicy,
}

impl OpenDataService {
    pub fn new(
        fetcher: Arc<dyn TextFetcher>,
        cache: TtlCache,
        catalog: SourceCatalog,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            cache,
            catalog,
            policy,
        }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub async fn load(&self, dataset: Dataset) -> Result<DatasetPayload, OpenDataError> {
        let sources = self.catalog.sources(dataset);
        self.fetch_with_fallback(dataset.key(), &sources).await
    }

    /// Serves a fresh cache entry, otherwise walks `sources` in order with
    /// `policy.attempts` tries each. Falls back to any cached value, however
    /// old, before giving up.
    pub async fn fetch_with_fallback(
        &self,
        key: &str,
        sources: &[Source],
    ) -> Result<DatasetPayload, OpenDataError> {
        if let Some(Value::Array(records)) = self.cache.get_fresh(key) {
            debug!("Cache hit for {}", key);
            return Ok(DatasetPayload {
                records,
                freshness: Freshness::Cached,
            });
        }
        debug!("Cache miss for {}", key);

        let mut attempts = 0;
        let mut last_error = String::from("no upstream sources configured");

        for source in sources {
            for attempt in 1..=self.policy.attempts {
                attempts += 1;
                match self.attempt(source).await {
                    Ok(records) => {
                        info!(
                            dataset = key,
                            source = %source.name,
                            count = records.len(),
                            "Refreshed dataset"
                        );
                        self.cache.put(key, Value::Array(records.clone()));
                        return Ok(DatasetPayload {
                            records,
                            freshness: Freshness::Live,
                        });
                    }
                    Err(e) => {
                        warn!(
                            dataset = key,
                            source = %source.name,
                            attempt,
                            error = %e,
                            "Upstream attempt failed"
                        );
                        last_error = format!("{}: {}", source.name, e);
                    }
                }

                if attempt < self.policy.attempts {
                    let delay = self.policy.delay_after(attempt);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }

        if let Some(entry) = self.cache.get(key) {
            if let Value::Array(records) = entry.payload {
                warn!(
                    dataset = key,
                    age_secs = entry.timestamp.elapsed().as_secs(),
                    "All sources failed, serving stale cache"
                );
                return Ok(DatasetPayload {
                    records,
                    freshness: Freshness::Stale,
                });
            }
        }

        Err(OpenDataError::Exhausted {
            key: key.to_string(),
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, source: &Source) -> Result<Vec<Value>, AttemptError> {
        let fetched = self
            .fetcher
            .fetch_text(&source.url, self.policy.timeout)
            .await?;
        parse_array(&fetched.body)
            .ok_or_else(|| AttemptError::NotArray(preview(&fetched.body, PREVIEW_CHARS)))
    }

    /// One request to the direct source, for diagnosing upstream format drift.
    /// The body is reported whatever the status.
    pub async fn probe(&self, dataset: Dataset, max_chars: usize) -> Probe {
        let url = self.catalog.direct_url(dataset);
        match self.fetcher.fetch_raw(&url, self.policy.timeout).await {
            Ok(fetched) => Probe {
                status: Some(fetched.status),
                length: fetched.body.chars().count(),
                preview: preview(&fetched.body, max_chars),
                error: (!(200..300).contains(&fetched.status))
                    .then(|| format!("HTTP {}", fetched.status)),
                url,
            },
            Err(e) => Probe {
                status: None,
                length: 0,
                preview: String::new(),
                error: Some(e.to_string()),
                url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_grows_with_attempt() {
        let policy = RetryPolicy {
            backoff: Backoff::Linear,
            delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), policy.delay_after(2));
    }

    #[test]
    fn backoff_parses_case_insensitively() {
        assert_eq!("Linear".parse::<Backoff>(), Ok(Backoff::Linear));
        assert!("exponential".parse::<Backoff>().is_err());
    }
}
