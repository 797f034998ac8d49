//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Only two kinds ever surface
//! to the caller: a terminal [`FetchError`] and an exhausted-retry
//! [`ExtractionError`]; everything else degrades inside its own stage.

use thiserror::Error;

/// Terminal errors surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Page retrieval failed after the fallback chain was exhausted.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Primary extraction failed after all retries.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Errors from the tiered fetch strategy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or has no host.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// URL scheme not allowed (e.g., file://, ftp://).
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Headless-browser rendering failed.
    #[error("browser rendering failed: {0}")]
    Browser(String),

    /// Bypass service call failed.
    #[error("bypass service error: {0}")]
    Bypass(#[from] scrapingbee_client::ScrapingBeeError),

    /// Request exceeded its deadline.
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors from LLM backends.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API returned a non-success status.
    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The model returned no usable choices/content.
    #[error("empty completion")]
    EmptyCompletion,

    /// Client is not configured (missing key, disabled backend).
    #[error("LLM backend not configured: {0}")]
    NotConfigured(String),
}

/// Errors from the primary extraction stage. Recoverable at the
/// orchestrator's retry boundary, then fatal.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Backend call failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Model output was not the JSON object the schema demands.
    #[error("malformed model output: {reason}")]
    MalformedResponse { reason: String },

    /// Model returned an empty field set.
    #[error("model returned no fields")]
    EmptyResponse,
}

/// Errors from web-search backends.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("search API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Errors inside the inference-escalation stage. Never fatal.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("unparsable escalation output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors inside the enrichment stage. Never fatal.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("unparsable enrichment output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
