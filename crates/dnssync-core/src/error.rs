//! Error types for dnssync
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnssync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnssync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Listing records from a source or target failed
    #[error("failed to fetch records from {provider} for zone {zone}: {source}")]
    Fetch {
        /// Zone being synchronized
        zone: String,
        /// Provider identity (as configured)
        provider: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A target rejected a change set
    #[error("failed to apply changes to target {target} for zone {zone}: {source}")]
    Apply {
        /// Zone being synchronized
        zone: String,
        /// Target identity (as configured)
        target: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// I/O errors (file backend, config loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap a listing failure with zone and provider context
    pub fn fetch(zone: impl Into<String>, provider: impl Into<String>, source: Error) -> Self {
        Self::Fetch {
            zone: zone.into(),
            provider: provider.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an apply failure with zone and target context
    pub fn apply(zone: impl Into<String>, target: impl Into<String>, source: Error) -> Self {
        Self::Apply {
            zone: zone.into(),
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_carries_zone_and_provider() {
        let err = Error::fetch("example.com", "file{/tmp/zone.json}", Error::not_found("zone"));
        let msg = err.to_string();
        assert!(msg.contains("example.com"));
        assert!(msg.contains("file{/tmp/zone.json}"));
        assert!(msg.contains("Not found: zone"));
    }

    #[test]
    fn apply_error_exposes_source() {
        use std::error::Error as _;

        let err = Error::apply("example.com", "memory", Error::rate_limited("slow down"));
        let source = err.source().expect("apply error has a source");
        assert_eq!(source.to_string(), "Rate limited: slow down");
    }
}
