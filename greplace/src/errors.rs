//! Error types for the search engine.
//!
//! Only configuration-time problems surface as errors: an empty root, an
//! empty pattern, or a pattern that does not compile. Everything that goes
//! wrong while a run is in flight (unreadable file, over-cap file, failed
//! backup) degrades to "this file contributes no result" and is reported
//! through logging, never through `SearchError`.

use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while preparing a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SearchError {
    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SearchError::invalid_pattern("Invalid regex");
        assert!(matches!(err, SearchError::InvalidPattern(_)));

        let err = SearchError::config_error("missing pattern");
        assert!(matches!(err, SearchError::ConfigError(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::invalid_pattern("missing closing brace");
        assert_eq!(err.to_string(), "Invalid pattern: missing closing brace");

        let err = SearchError::config_error("Missing required field");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );
    }
}
