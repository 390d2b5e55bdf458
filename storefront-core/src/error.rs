//! Error types for storefront operations

/// Result type for storefront operations
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Error types for the storefront assistant
#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    /// Submitted text was empty or whitespace only
    #[error("Invalid input: message text is empty")]
    InvalidInput,

    /// The session was torn down
    #[error("Session disposed")]
    SessionDisposed,

    /// Backend rejected the request or returned something unusable
    #[error("Backend error: {0}")]
    Backend(String),

    /// Connection-level or retryable backend failure
    #[error("Transient backend error: {0}")]
    Transient(String),

    /// Reply did not arrive within the configured timeout
    #[error("Reply timed out")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StorefrontError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorefrontError::Transient(_))
    }
}

impl From<String> for StorefrontError {
    fn from(s: String) -> Self {
        StorefrontError::Other(s)
    }
}

impl From<&str> for StorefrontError {
    fn from(s: &str) -> Self {
        StorefrontError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for StorefrontError {
    fn from(err: anyhow::Error) -> Self {
        StorefrontError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(StorefrontError::Transient("reset".into()).is_retryable());
        assert!(!StorefrontError::Backend("400".into()).is_retryable());
        assert!(!StorefrontError::Timeout.is_retryable());
        assert!(!StorefrontError::InvalidInput.is_retryable());
    }

    #[test]
    fn test_string_conversion() {
        let err: StorefrontError = "boom".into();
        assert_eq!(err.to_string(), "boom");
    }
}
