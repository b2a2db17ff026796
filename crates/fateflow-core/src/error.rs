//! Core domain errors.

use thiserror::Error;

/// Core domain errors for FATE Flow.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Provider identity outside the closed set of known providers.
    #[error("not support component provider: {0}")]
    UnsupportedProvider(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
