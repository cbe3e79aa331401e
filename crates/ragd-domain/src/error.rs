//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ragd service
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input supplied by a caller
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the invalid input
        message: String,
    },

    /// Transport-level failure while fetching remote content
    #[error("Fetch error: {message}")]
    Fetch {
        /// Description of the transport failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document yielded no usable text after sanitization
    #[error("No content after cleaning")]
    EmptyContent,

    /// Chunker produced zero chunks from non-empty content
    #[error("No chunks created")]
    NoChunks,

    /// Embedding provider operation error
    #[error("Embedding provider error: {message}")]
    Embedding {
        /// Description of the embedding failure
        message: String,
    },

    /// Vector store operation error
    #[error("Vector store error: {message}")]
    VectorStore {
        /// Description of the vector store failure
        message: String,
    },

    /// Lexical index operation error
    #[error("Index error: {message}")]
    Index {
        /// Description of the index failure
        message: String,
    },

    /// Remote provider (LLM, cross-encoder, PDF extractor) error
    #[error("Provider error: {message}")]
    Provider {
        /// Description of the provider failure
        message: String,
    },

    /// New job refused because the active-job ceiling is reached
    #[error("Maximum concurrent jobs ({limit}) reached")]
    AdmissionDenied {
        /// Configured concurrency ceiling
        limit: usize,
    },

    /// Client exceeded the request rate limit
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Operation exceeded its deadline
    #[error("Timeout: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
    },

    /// Job store circuit breaker is open, failing fast
    #[error("Job store unavailable (circuit open)")]
    StoreUnavailable,

    /// Resource not found
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Missing or rejected credentials
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Reason the request was rejected
        message: String,
    },

    /// Job store operation error
    #[error("Store error: {message}")]
    Store {
        /// Description of the store failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key that is invalid
        key: String,
        /// Reason why it is invalid
        message: String,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Basic error creation methods
impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fetch error with source
    pub fn fetch_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an embedding provider error
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a vector store error
    pub fn vector_store<S: Into<String>>(message: S) -> Self {
        Self::VectorStore {
            message: message.into(),
        }
    }

    /// Create a lexical index error
    pub fn index<S: Into<String>>(message: S) -> Self {
        Self::Index {
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with source
    pub fn store_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl Error {
    /// Returns `true` if this error came from the job store boundary.
    ///
    /// Store-boundary failures feed the orchestrator's circuit breaker;
    /// every other kind passes through without tripping it.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_denied_message_names_limit() {
        let err = Error::AdmissionDenied { limit: 10 };
        assert_eq!(err.to_string(), "Maximum concurrent jobs (10) reached");
    }

    #[test]
    fn empty_content_matches_pipeline_terminal_message() {
        assert_eq!(Error::EmptyContent.to_string(), "No content after cleaning");
        assert_eq!(Error::NoChunks.to_string(), "No chunks created");
    }

    #[test]
    fn only_store_errors_feed_the_breaker() {
        assert!(Error::store("boom").is_store_failure());
        assert!(!Error::embedding("boom").is_store_failure());
        assert!(!Error::StoreUnavailable.is_store_failure());
    }
}
