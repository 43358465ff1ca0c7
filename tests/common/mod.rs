#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use furfriends::api::fetcher::{FetchError, FetchedText, TextFetcher};

/// Plays back canned responses in order and records every requested URL.
/// Once the script runs out, every call fails with a network error.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<FetchedText, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<FetchedText, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, response: Result<FetchedText, FetchError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextFetcher for ScriptedFetcher {
    async fn fetch_raw(&self, url: &str, _timeout: Duration) -> Result<FetchedText, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("script exhausted".to_string())))
    }
}

pub fn ok(body: &str) -> Result<FetchedText, FetchError> {
    Ok(FetchedText {
        status: 200,
        body: body.to_string(),
    })
}

pub fn status(status: u16, body: &str) -> Result<FetchedText, FetchError> {
    Ok(FetchedText {
        status,
        body: body.to_string(),
    })
}

pub fn unavailable() -> Result<FetchedText, FetchError> {
    status(503, "Service Unavailable")
}

pub fn timed_out() -> Result<FetchedText, FetchError> {
    Err(FetchError::Timeout(Duration::from_secs(1)))
}
