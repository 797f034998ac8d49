//! Web searcher trait for enrichment and search-backed classification.
//!
//! The pipeline uses search in two places: confirming a domain
//! classification, and enriching a record whose critical fields survived
//! every earlier stage empty. Both want a synthesized *answer*, not a list
//! of links, so the trait returns the backend's answer text plus the
//! sources and citations behind it.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::SearchError;
use crate::types::{Citation, SearchSource};

/// A synthesized search answer with its supporting sources.
#[derive(Debug, Clone, Default)]
pub struct SearchAnswer {
    /// Answer text synthesized by the search backend. May be empty when
    /// the backend found nothing useful.
    pub answer: String,

    /// Pages the backend consulted.
    pub sources: Vec<SearchSource>,

    /// Citations into the answer, with byte spans when the backend
    /// reports them.
    pub citations: Vec<Citation>,
}

impl SearchAnswer {
    pub fn is_empty(&self) -> bool {
        self.answer.trim().is_empty()
    }
}

/// Web search with answer synthesis.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchAnswer, SearchError>;
}

/// Tavily-backed searcher.
pub struct TavilySearcher {
    api_key: SecretString,
    client: reqwest::Client,
    /// Number of sources requested per search.
    pub max_results: usize,
}

impl TavilySearcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            client: reqwest::Client::new(),
            max_results: 5,
        }
    }

    /// Create from the `TAVILY_API_KEY` environment variable.
    pub fn from_env() -> Option<Self> {
        std::env::var("TAVILY_API_KEY").ok().map(Self::new)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl Searcher for TavilySearcher {
    async fn search(&self, query: &str) -> Result<SearchAnswer, SearchError> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            query: &'a str,
            search_depth: &'a str,
            include_answer: bool,
            max_results: usize,
        }

        #[derive(serde::Deserialize)]
        struct Response {
            answer: Option<String>,
            #[serde(default)]
            results: Vec<TavilyResult>,
        }

        #[derive(serde::Deserialize)]
        struct TavilyResult {
            url: String,
            title: Option<String>,
            content: Option<String>,
        }

        let request = Request {
            query,
            search_depth: "basic",
            include_answer: true,
            max_results: self.max_results,
        };

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .header("Content-Type", "application/json")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: Response = response
            .json()
            .await
            .map_err(|e| SearchError::Http(Box::new(e)))?;

        let sources: Vec<SearchSource> = parsed
            .results
            .into_iter()
            .map(|r| SearchSource {
                url: r.url,
                title: r.title,
                snippet: r.content,
            })
            .collect();

        // Tavily reports no answer spans; citations carry sources only.
        let citations = sources
            .iter()
            .map(|s| Citation {
                url: s.url.clone(),
                start: None,
                end: None,
            })
            .collect();

        Ok(SearchAnswer {
            answer: parsed.answer.unwrap_or_default(),
            sources,
            citations,
        })
    }
}

/// Mock searcher for testing.
#[derive(Default)]
pub struct MockSearcher {
    answers: std::sync::RwLock<std::collections::HashMap<String, SearchAnswer>>,
    fail_all: bool,
    calls: std::sync::RwLock<Vec<String>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script an answer for an exact query.
    pub fn with_answer(self, query: impl Into<String>, answer: SearchAnswer) -> Self {
        self.answers.write().unwrap().insert(query.into(), answer);
        self
    }

    /// Script a plain-text answer returned for ANY query.
    pub fn with_any_answer(self, text: impl Into<String>) -> Self {
        self.with_answer(
            "*",
            SearchAnswer {
                answer: text.into(),
                sources: vec![SearchSource {
                    url: "https://search.example.com/result".into(),
                    title: None,
                    snippet: None,
                }],
                citations: vec![],
            },
        )
    }

    /// Make every search fail.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Queries issued so far.
    pub fn queries(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    async fn search(&self, query: &str) -> Result<SearchAnswer, SearchError> {
        self.calls.write().unwrap().push(query.to_string());
        if self.fail_all {
            return Err(SearchError::Api {
                status: 503,
                message: "mock outage".into(),
            });
        }
        let answers = self.answers.read().unwrap();
        Ok(answers
            .get(query)
            .or_else(|| answers.get("*"))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_searcher_returns_scripted_answer() {
        let searcher = MockSearcher::new().with_any_answer("The fare is USD 12.");
        let answer = searcher.search("bus fare").await.unwrap();
        assert!(answer.answer.contains("USD 12"));
        assert_eq!(searcher.queries(), vec!["bus fare".to_string()]);
    }

    #[tokio::test]
    async fn mock_searcher_defaults_to_empty_answer() {
        let searcher = MockSearcher::new();
        let answer = searcher.search("anything").await.unwrap();
        assert!(answer.is_empty());
    }
}
