//! Error types for the task initializer.

use std::path::PathBuf;

use thiserror::Error;

/// Exit status of a process whose initialization pass failed.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// Errors reading or writing a JSON artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Well-formed JSON that does not describe a valid artifact.
    #[error("Invalid {artifact}: {reason}")]
    Invalid { artifact: String, reason: String },
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

/// Errors loading the component provider registry.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not support component provider: {0}")]
    UnsupportedProvider(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Errors applying process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid coordinator address '{0}', expected host:port")]
    InvalidCoordinator(String),

    #[error("Invalid value '{value}' for config field {key}")]
    InvalidValue { key: String, value: String },

    #[error("No component provider selected")]
    NoActiveProvider,
}

/// Errors raised by a component resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Component '{0}' is not declared in the job dsl")]
    UnknownComponent(String),

    #[error("Invalid parameters for component '{component}': {reason}")]
    InvalidParameters { component: String, reason: String },

    #[error("Resolver failed: {0}")]
    Failed(String),
}

/// Errors raised by a task controller.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Task rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] ArtifactError),
}

/// Errors that abort a task initialization pass.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("not support component provider: {0}")]
    UnsupportedProvider(String),

    #[error("Failed to load artifact: {0}")]
    ArtifactLoad(#[from] ArtifactError),

    #[error("Failed to resolve component '{component}': {source}")]
    Resolution {
        component: String,
        #[source]
        source: ResolveError,
    },

    #[error("Failed to create task for component '{component}': {source}")]
    Submission {
        component: String,
        #[source]
        source: SubmitError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write result: {0}")]
    ResultWrite(#[source] ArtifactError),
}

impl From<CatalogError> for InitError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnsupportedProvider(name) => Self::UnsupportedProvider(name),
            CatalogError::Artifact(e) => Self::ArtifactLoad(e),
        }
    }
}
