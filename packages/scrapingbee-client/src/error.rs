use thiserror::Error;

/// Errors returned by the ScrapingBee client.
#[derive(Debug, Error)]
pub enum ScrapingBeeError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("ScrapingBee API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered but the scraped page itself failed.
    #[error("target fetch failed with status {status}")]
    TargetStatus { status: u16 },

    /// Response body was empty.
    #[error("empty response body")]
    EmptyBody,
}

pub type Result<T> = std::result::Result<T, ScrapingBeeError>;
