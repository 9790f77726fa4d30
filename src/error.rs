//! Error types for the vigil research loop.

/// Top-level error type for the research daemon.
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persisted state load/save error.
    #[error("state error: {0}")]
    State(String),

    /// Reasoning backend error.
    #[error("reasoning error: {0}")]
    Reasoning(String),

    /// Search provider error (web or forum lookup).
    #[error("research error: {0}")]
    Research(String),

    /// Notification sink error.
    #[error("notify error: {0}")]
    Notify(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BrainError>;
