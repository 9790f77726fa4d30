//! Error types for the vigil-search crate.
//!
//! All errors carry stable string messages suitable for logging. Search
//! queries never appear in error text.

/// Errors that can occur during a web search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to the search engine failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse the search engine response HTML.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for vigil-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
