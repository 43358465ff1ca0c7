use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::info;

use crate::api::sources::{MirrorTemplate, DEFAULT_MIRRORS, DEFAULT_OPEN_DATA_BASE};
use crate::models::cache::DEFAULT_TTL;
use crate::services::open_data::{Backoff, RetryPolicy};

pub const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "https://pipi-first-web.onrender.com",
    "https://pipi123123.github.io",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    /// `max-age` advertised on proxy responses.
    pub proxy_max_age: u64,
    pub open_data_base: String,
    pub mirrors: Vec<MirrorTemplate>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let attempts: u32 = try_load(&lookup, "FETCH_ATTEMPTS", "3")?;
        if attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "FETCH_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        let retry = RetryPolicy {
            attempts,
            delay: Duration::from_millis(try_load(&lookup, "RETRY_DELAY_MS", "500")?),
            backoff: try_load::<Backoff, _>(&lookup, "RETRY_BACKOFF", "fixed")?,
            timeout: Duration::from_secs(try_load(&lookup, "FETCH_TIMEOUT_SECS", "20")?),
        };

        let mirrors = load_list(&lookup, "OPEN_DATA_MIRRORS", DEFAULT_MIRRORS)
            .iter()
            .map(|template| {
                MirrorTemplate::parse(template).map_err(|e| ConfigError::Invalid {
                    key: "OPEN_DATA_MIRRORS",
                    value: template.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            port: try_load(&lookup, "PORT", "3000")?,
            allowed_origins: load_list(&lookup, "ALLOWED_ORIGINS", DEFAULT_ORIGINS),
            cache_ttl: Duration::from_secs(try_load(
                &lookup,
                "CACHE_TTL_SECS",
                &DEFAULT_TTL.as_secs().to_string(),
            )?),
            retry,
            proxy_max_age: try_load(&lookup, "PROXY_MAX_AGE_SECS", "60")?,
            open_data_base: lookup("OPEN_DATA_BASE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_OPEN_DATA_BASE.to_string()),
            mirrors,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            cache_ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            proxy_max_age: 60,
            open_data_base: DEFAULT_OPEN_DATA_BASE.to_string(),
            mirrors: DEFAULT_MIRRORS
                .iter()
                .filter_map(|template| MirrorTemplate::parse(template).ok())
                .collect(),
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })
}

/// Comma-separated list. Set but empty means an empty list.
fn load_list<F>(lookup: &F, key: &str, default: &[&str]) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        None => {
            info!("{key} not set, using defaults");
            default.iter().map(|item| item.to_string()).collect()
        }
    }
}
