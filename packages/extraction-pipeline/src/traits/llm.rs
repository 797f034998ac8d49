//! LLM trait for the pipeline's model calls.
//!
//! Implementations wrap a specific provider and handle prompting and
//! response transport; the pipeline only sees text in, text plus token
//! usage out.

use async_trait::async_trait;

use crate::error::LlmError;

/// A completed model call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Raw completion text.
    pub text: String,

    /// Total tokens billed for the call (prompt + completion).
    pub tokens_used: u64,
}

/// LLM backend used by classification, extraction, escalation and
/// enrichment. One trait, two entry points: free-form and JSON-mode.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Free-form completion.
    async fn complete(&self, system: &str, user: &str) -> Result<LlmResponse, LlmError>;

    /// Completion constrained to a single JSON object. Backends without a
    /// native JSON mode fall back to a plain completion; the caller still
    /// parses defensively either way.
    async fn complete_json(&self, system: &str, user: &str) -> Result<LlmResponse, LlmError> {
        self.complete(system, user).await
    }
}
