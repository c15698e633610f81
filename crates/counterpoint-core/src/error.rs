use std::path::PathBuf;

use thiserror::Error;

/// Core error type for the counter-perspective pipeline.
///
/// Only configuration loading and the upstream analysis session surface these
/// to a caller. Inside the pipeline every variant is absorbed at the lowest
/// layer that can handle it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("search provider unavailable: {0}")]
    SearchUnavailable(String),
    #[error("verification scorer degraded: {0}")]
    VerifierDegraded(String),
    #[error("malformed counter-argument: {0}")]
    MalformedArgument(String),
    #[error("pipeline deadline elapsed after {elapsed_ms} ms")]
    PipelineTimeout { elapsed_ms: u64 },
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transcription produced no text")]
    TranscriptionEmpty,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn search(reason: impl Into<String>) -> Self {
        Self::SearchUnavailable(reason.into())
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::VerifierDegraded(reason.into())
    }

    /// Whether a retry inside the owning component may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SearchUnavailable(_))
    }
}
