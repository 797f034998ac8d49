//! Mock implementations for testing.
//!
//! Useful for exercising the pipeline without real model or network
//! calls. The searcher mock lives next to its trait in
//! [`crate::traits::searcher`].

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::{FetchError, FetchResult, LlmError};
use crate::traits::fetcher::PageFetcher;
use crate::traits::llm::{LlmClient, LlmResponse};
use crate::types::RawFetchResult;

/// Tokens billed per mock LLM call.
const MOCK_TOKENS_PER_CALL: u64 = 100;

/// A scripted LLM.
///
/// Responses and errors are queued in order; once the script runs out,
/// every further call answers `{}`. Calls are recorded for assertions.
#[derive(Default)]
pub struct MockLlm {
    script: Mutex<VecDeque<Result<String, ()>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue a backend failure.
    pub fn with_error(self) -> Self {
        self.script.lock().unwrap().push_back(Err(()));
        self
    }

    /// `(system, user)` prompt pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmResponse, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(LlmResponse {
                text,
                tokens_used: MOCK_TOKENS_PER_CALL,
            }),
            Some(Err(())) => Err(LlmError::Api {
                status: 500,
                message: "mock backend failure".to_string(),
            }),
            None => Ok(LlmResponse {
                text: "{}".to_string(),
                tokens_used: MOCK_TOKENS_PER_CALL,
            }),
        }
    }
}

/// A scripted page fetcher.
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<HashMap<String, RawFetchResult>>,
    failures: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a page for a URL.
    pub fn with_page(self, url: impl Into<String>, page: RawFetchResult) -> Self {
        self.pages.lock().unwrap().insert(url.into(), page);
        self
    }

    /// Make fetches of a URL fail.
    pub fn failing_for(self, url: impl Into<String>) -> Self {
        self.failures.lock().unwrap().insert(url.into());
        self
    }

    /// URLs fetched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failures.lock().unwrap().contains(url) {
            return Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock fetch failure",
            ))));
        }

        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                FetchError::Http(Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no scripted page for {url}"),
                )))
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
