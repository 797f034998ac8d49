//! Adaptive Travel-Content Extraction Pipeline
//!
//! Given a URL, the pipeline fetches the page through a tiered strategy
//! (anti-bot bypass / headless rendering / lightweight HTTP), classifies
//! the content's domain and granularity through cascading detectors, and
//! runs a multi-stage LLM-assisted extraction that yields a typed,
//! schema-constrained, confidence-scored record.
//!
//! # Design Philosophy
//!
//! **Degrade, don't die.**
//!
//! - Whitelist schemas per domain: fields outside the active schema never
//!   pass through
//! - Every value carries provenance: a verbatim quote, structured data,
//!   an inference tag, or a web-search tag
//! - Each stage catches its own failures; only a terminal fetch error or
//!   an exhausted-retry extraction error reaches the caller
//! - External clients are injected, never global
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extraction_pipeline::{
//!     ExtractionRequest, FetchStrategy, OpenAiClient, Pipeline, PipelineConfig,
//!     TavilySearcher,
//! };
//!
//! let config = PipelineConfig::default();
//! let fetcher = Arc::new(FetchStrategy::new(&config.fetch));
//! let llm = Arc::new(OpenAiClient::from_env()?);
//!
//! let pipeline = Pipeline::new(fetcher, llm, config)
//!     .with_searcher(Arc::new(TavilySearcher::from_env().unwrap()));
//!
//! let record = pipeline
//!     .run(ExtractionRequest::new("https://example.com/tour/42-arenal"))
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (PageFetcher, LlmClient, Searcher)
//! - [`types`] - Requests, fetch results, classifications, records
//! - [`schema`] - Per-domain field schemas and prompt dispatch
//! - [`fetch`] - Tiered retrieval with per-host rate limiting
//! - [`classify`] - Cascading domain/granularity detection
//! - [`preextract`] - Embedded structured-data parsing
//! - [`extract`] - Schema-guided primary extraction
//! - [`validate`] - Coercion, conversion, whitelisting
//! - [`escalate`] - Gap-filling inference passes
//! - [`enrich`] - Search-based enrichment
//! - [`pipeline`] - The orchestrator
//! - [`testing`] - Mock implementations for tests

pub mod classify;
pub mod config;
pub mod content;
pub mod enrich;
pub mod error;
pub mod escalate;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod preextract;
pub mod schema;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validate;

// Re-export core types at crate root
pub use error::{
    EnrichmentError, EscalationError, ExtractionError, FetchError, LlmError, PipelineError,
    SearchError,
};
pub use traits::{
    fetcher::PageFetcher,
    llm::{LlmClient, LlmResponse},
    searcher::{MockSearcher, SearchAnswer, Searcher, TavilySearcher},
};
pub use types::{
    Citation, Classification, ContentDomain, Detection, EnrichmentContext, ExtractedRecord,
    ExtractionRequest, FetchMethod, Granularity, Provenance, RawFetchResult, SearchSource,
};

// Re-export the pipeline and its configuration
pub use config::PipelineConfig;
pub use pipeline::Pipeline;

// Re-export stage components
pub use classify::TypeClassifier;
pub use enrich::EnrichmentSearcher;
pub use escalate::{EscalationPolicy, InferenceEscalator};
pub use extract::PrimaryExtractor;
pub use schema::{FieldKind, FieldSchema, SchemaRegistry};
pub use validate::{CurrencyConfig, Validator};

// Re-export fetchers
pub use fetch::{
    BrowserFetcher, BypassFetcher, DomainRateLimiter, FetchConfig, FetchStrategy, HttpFetcher,
    SiteFlags,
};

// Re-export the LLM client
pub use llm::OpenAiClient;

// Re-export testing utilities
pub use testing::{MockFetcher, MockLlm};
