//! Error types for the DnsSim environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Request URL could not be parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request URL parsed but carries no host to resolve
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

impl EnvError {
    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
