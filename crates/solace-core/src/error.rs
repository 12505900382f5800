//! Error types for the check-in core.

use thiserror::Error;

/// Result alias used by capability traits and the archive.
pub type CheckinResult<T> = Result<T, CheckinError>;

/// Failures raised by signal sources, persistence, and configuration.
///
/// Signal-source variants (`Generation`, `Classifier`, `AudioFeatures`) are always
/// recovered inside the orchestrator; they only surface from the capability impls.
#[derive(Error, Debug)]
pub enum CheckinError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("emotion classifier failed: {0}")]
    Classifier(String),

    #[error("audio feature extraction failed: {0}")]
    AudioFeatures(String),

    #[error("session archive error: {0}")]
    Archive(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
