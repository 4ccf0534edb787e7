//! Error types for the medsynth generation pipeline.
//!
//! Generation itself is pure sampling and cannot fail once its inputs are
//! valid, so almost every error originates at the edges: loading and
//! validating configuration or catalogs, and persisting tables.

use thiserror::Error;

/// The unified error type for the medsynth workspace.
#[derive(Debug, Error)]
pub enum MedsynthError {
    /// A simulation setting is missing, malformed, or out of range.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The condition/medication/carrier catalog is malformed or inconsistent.
    #[error("catalog error: {reason}")]
    CatalogError { reason: String },

    /// A sink could not persist a generated table.
    #[error("output error: {reason}")]
    OutputError { reason: String },

    /// A generated dataset violated one or more consistency rules.
    #[error("dataset verification failed: {reason}")]
    VerificationFailed { reason: String },
}

/// Convenience alias used throughout the medsynth crates.
pub type MedsynthResult<T> = Result<T, MedsynthError>;
