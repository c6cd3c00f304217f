//! Error types for the resolution cache.

use thiserror::Error;

/// Errors raised while building a `DnsCache`.
///
/// Once constructed, every cache operation is total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl CacheError {
    /// Creates an invalid-configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
