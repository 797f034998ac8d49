//! Core trait abstractions: page fetching, LLM calls, web search.
//!
//! External service clients are constructed by the caller and passed in
//! (dependency injection); the pipeline holds no global state and every
//! seam has a mock implementation for tests.

pub mod fetcher;
pub mod llm;
pub mod searcher;

pub use fetcher::PageFetcher;
pub use llm::{LlmClient, LlmResponse};
pub use searcher::{MockSearcher, SearchAnswer, Searcher, TavilySearcher};
