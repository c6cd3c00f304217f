//! Error types for the simulation harness.

use dnssim_core::CacheError;
use dnssim_env::EnvError;
use thiserror::Error;

/// Errors surfaced while setting up or exporting a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Request error: {0}")]
    Request(#[from] EnvError),

    /// Workload parameters rejected by the sampling distributions
    #[error("Workload error: {0}")]
    Workload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
