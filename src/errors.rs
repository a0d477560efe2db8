/*!
 * Error types for the bookwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete within the provider timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The provider answered but produced no text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Map a reqwest transport error onto the provider taxonomy
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status onto the provider taxonomy
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Whether another attempt against the same provider may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors raised by the persisted translation cache
#[derive(Error, Debug)]
pub enum StoreError {
    /// The cache file exists but could not be read
    #[error("Failed to read cache file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but does not contain a string map
    #[error("Cache file {path:?} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory map could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing or replacing the cache file failed
    #[error("Failed to write cache file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by document collaborators
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input format is not handled by any registered source
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Reading or writing a document failed
    #[error("Document IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading the proper-noun substitution table
#[derive(Error, Debug)]
pub enum GlossaryError {
    /// The table file could not be read
    #[error("Failed to read glossary {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table file is not a supported JSON shape
    #[error("Failed to parse glossary {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A term could not be turned into a matcher
    #[error("Invalid glossary term '{term}': {message}")]
    InvalidTerm { term: String, message: String },
}
